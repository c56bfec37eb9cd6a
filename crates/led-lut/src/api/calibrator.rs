//! Calibrator builder: the whole chain from log lines to a table.

use super::CalibrationError;
use crate::join::{join_triplets, JoinReport};
use crate::model::RawSample;
use crate::parse::LogParser;
use crate::red::{approximate_red, RedApproximation};
use crate::solve::{solve, CalibrationTable, PwmMode, SolveOptions};
use crate::sync::{SyncOptions, SyncReport, Synchronizer};

/// Every intermediate result of a calibration run.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Parsed samples, in log order.
    pub samples: Vec<RawSample>,
    pub sync: SyncReport,
    pub join: JoinReport,
    pub red: RedApproximation,
    pub table: CalibrationTable,
}

/// Hooks called as each stage of [`Calibrator::run_observed`] completes.
///
/// Every method defaults to doing nothing. A stage's hook runs before any
/// later stage can fail, so a caller reporting from here keeps the
/// diagnostics of every stage that finished.
pub trait StageObserver {
    fn parsed(&mut self, _samples: &[RawSample]) {}

    /// Called with the lenient report, before a strict series check.
    fn synchronized(&mut self, _report: &SyncReport) {}

    fn joined(&mut self, _report: &JoinReport) {}

    fn red_approximated(&mut self, _red: &RedApproximation) {}

    fn solved(&mut self, _table: &CalibrationTable) {}
}

impl StageObserver for () {}

/// End-to-end calibration with fluent configuration.
///
/// Stages run in order: parse, synchronize, join, red extrapolation, solve.
/// The rig-specific thresholds are constructor arguments; everything else has
/// a default.
///
/// - [`run()`](Self::run) takes `&self`, so one calibrator can process
///   several captures
/// - a truncated final series is accepted unless
///   [`strict_series`](Self::strict_series) is set
///
/// # Example
///
/// ```
/// use led_lut::{Calibrator, SyncOptions};
///
/// let calibrator = Calibrator::new(SyncOptions::new(13.0, 500.0), 300.0).steps(11);
/// // No samples: the first green peak cannot be found.
/// assert!(calibrator.run(["boot"]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Calibrator {
    parser: LogParser,
    synchronizer: Synchronizer,
    red_threshold: f64,
    solve: SolveOptions,
    strict_series: bool,
}

impl Calibrator {
    /// Create a calibrator with the rig's sync thresholds and the red
    /// calibration threshold.
    pub fn new(sync: SyncOptions, red_threshold: f64) -> Self {
        Self {
            parser: LogParser::default(),
            synchronizer: Synchronizer::new(sync),
            red_threshold,
            solve: SolveOptions::default(),
            strict_series: false,
        }
    }

    /// Set the sensor tag of log lines.
    #[inline]
    pub fn log_tag(mut self, tag: &str) -> Self {
        self.parser = LogParser::new(tag);
        self
    }

    /// Set the number of brightness steps.
    #[inline]
    pub fn steps(mut self, steps: usize) -> Self {
        self.solve = self.solve.steps(steps);
        self
    }

    /// Set the PWM duty computation.
    #[inline]
    pub fn pwm_mode(mut self, mode: PwmMode) -> Self {
        self.solve = self.solve.pwm_mode(mode);
        self
    }

    /// Fail on a truncated final series instead of stopping there.
    #[inline]
    pub fn strict_series(mut self, enabled: bool) -> Self {
        self.strict_series = enabled;
        self
    }

    pub fn solve_options(&self) -> &SolveOptions {
        &self.solve
    }

    /// Run every stage over log `lines`.
    pub fn run<I>(&self, lines: I) -> Result<Calibration, CalibrationError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.run_observed(lines, &mut ())
    }

    /// Run every stage over log `lines`, reporting each one to `observer`.
    pub fn run_observed<I, O>(
        &self,
        lines: I,
        observer: &mut O,
    ) -> Result<Calibration, CalibrationError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        O: StageObserver + ?Sized,
    {
        let samples: Vec<RawSample> = lines
            .into_iter()
            .filter_map(|line| self.parser.parse_line(line.as_ref()).into_sample())
            .collect();
        observer.parsed(&samples);
        self.stages(samples, observer)
    }

    /// Run every stage after parsing.
    pub fn run_samples(&self, samples: Vec<RawSample>) -> Result<Calibration, CalibrationError> {
        self.stages(samples, &mut ())
    }

    fn stages<O>(
        &self,
        samples: Vec<RawSample>,
        observer: &mut O,
    ) -> Result<Calibration, CalibrationError>
    where
        O: StageObserver + ?Sized,
    {
        let mut sync = self.synchronizer.synchronize(&samples)?;
        observer.synchronized(&sync);
        if self.strict_series {
            sync = sync.into_strict()?;
        }

        let join = join_triplets(&sync.rows);
        observer.joined(&join);

        let red = approximate_red(&join.triplets, self.red_threshold)?;
        observer.red_approximated(&red);

        let table = solve(&red.triplets, &self.solve)?;
        observer.solved(&table);

        Ok(Calibration {
            samples,
            sync,
            join,
            red,
            table,
        })
    }
}
