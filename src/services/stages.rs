//! File-to-file stage commands.
//!
//! Each stage reads its whole input table, runs one step of the calibration
//! library and writes the next table. Diagnostics go through `tracing`.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};

use led_lut::emit::{emit_c_sources, CSources, LutArrays};
use led_lut::{
    join_triplets, CalibrationError, CalibrationTable, JoinDiagnostic, JoinReport,
    JoinedTriplet, LogParser, RawSample, RedApproximation, SolveOptions, SyncOptions, SyncReport,
    StageObserver, SyncedRow, Synchronizer,
};

use crate::error::{PipelineError, TableError};
use crate::models::{
    solver_columns, JoinedRecord, SampleRecord, SolverRecord, SyncedRecord, TableRecord,
};
use crate::services::tabular::{read_table, write_table, TableRead};

/// Replacements logged individually before the rest are only counted.
const LOGGED_REPLACEMENTS: usize = 3;

/// Read a text file (or stdin for `-`) as lines.
///
/// Bytes that are not UTF-8 are replaced rather than rejected, so a corrupt
/// line cannot stop the whole log.
pub fn read_log_lines(path: &Path) -> Result<Vec<String>, PipelineError> {
    let mut bytes = Vec::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|e| PipelineError::io(path, e))?;
    } else {
        bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    }
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

fn read_records<T: TableRecord>(path: &Path) -> Result<Vec<T>, TableError> {
    let TableRead { records, malformed } = read_table::<T>(path)?;
    if malformed > 0 {
        tracing::warn!(table = T::NAME, malformed, "Skipped malformed rows");
    }
    Ok(records)
}

/// Read a joined table, skipping rows without a drive current.
pub fn read_triplets(path: &Path) -> Result<Vec<JoinedTriplet>, TableError> {
    let records = read_records::<JoinedRecord>(path)?;
    Ok(records
        .into_iter()
        .map(JoinedTriplet::from)
        .filter(|t| {
            if t.current == 0 {
                tracing::debug!("Skipping joined row with current 0");
            }
            t.current > 0
        })
        .collect())
}

/// `parse-log`: extract sensor samples from a log.
pub fn parse_log(
    input: &Path,
    output: &Path,
    parser: &LogParser,
) -> Result<Vec<RawSample>, PipelineError> {
    let lines = read_log_lines(input)?;
    let samples: Vec<RawSample> = parser.samples(lines.iter()).collect();
    log_parse(lines.len(), &samples);

    let records: Vec<SampleRecord> = samples.iter().map(SampleRecord::from).collect();
    write_table(output, &records)?;
    Ok(samples)
}

/// `sync`: recover current-indexed rows from a samples table.
pub fn sync(
    input: &Path,
    output: &Path,
    options: SyncOptions,
    strict: bool,
) -> Result<SyncReport, PipelineError> {
    let samples: Vec<RawSample> = read_records::<SampleRecord>(input)?
        .into_iter()
        .map(RawSample::from)
        .collect();

    let report = synchronize(&samples, options, strict)?;
    let records: Vec<SyncedRecord> = report.rows.iter().map(SyncedRecord::from).collect();
    write_table(output, &records)?;
    Ok(report)
}

/// Synchronize and log, applying the truncated-series policy.
pub fn synchronize(
    samples: &[RawSample],
    options: SyncOptions,
    strict: bool,
) -> Result<SyncReport, PipelineError> {
    let mut report = Synchronizer::new(options)
        .synchronize(samples)
        .map_err(CalibrationError::from)?;
    log_sync(&report);
    if strict {
        report = report.into_strict().map_err(CalibrationError::from)?;
    }
    Ok(report)
}

/// `join`: group synced rows into per-current triplets.
pub fn join(input: &Path, output: &Path) -> Result<JoinReport, PipelineError> {
    let rows: Vec<SyncedRow> = read_records::<SyncedRecord>(input)?
        .into_iter()
        .map(SyncedRow::from)
        .collect();

    let report = join_triplets(&rows);
    log_join(&report);

    let records: Vec<JoinedRecord> = report.triplets.iter().map(JoinedRecord::from).collect();
    write_table(output, &records)?;
    Ok(report)
}

/// `approximate-red`: replace the low-current red readings.
pub fn approximate_red(
    input: &Path,
    output: &Path,
    threshold: f64,
) -> Result<RedApproximation, PipelineError> {
    let triplets = read_triplets(input)?;
    let red = led_lut::approximate_red(&triplets, threshold).map_err(CalibrationError::from)?;
    log_red(&red);

    let records: Vec<JoinedRecord> = red.triplets.iter().map(JoinedRecord::from).collect();
    write_table(output, &records)?;
    Ok(red)
}

/// `solve`: build the brightness table from a joined table.
pub fn solve(
    input: &Path,
    output: &Path,
    options: &SolveOptions,
) -> Result<CalibrationTable, PipelineError> {
    let triplets = read_triplets(input)?;
    let table = led_lut::solve(&triplets, options).map_err(CalibrationError::from)?;
    log_table(&table);

    let records: Vec<SolverRecord> = table.rows().iter().map(SolverRecord::from).collect();
    write_table(output, &records)?;
    Ok(table)
}

/// Paths of an emitted header/source pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFiles {
    pub header: PathBuf,
    pub source: PathBuf,
    pub steps: usize,
}

/// `emit`: render C sources from a solver table.
pub fn emit(
    input: &Path,
    prefix: &Path,
    values_per_line: usize,
) -> Result<EmittedFiles, PipelineError> {
    let records = read_records::<SolverRecord>(input)?;
    let (current, pwm) = solver_columns(&records);
    let arrays = LutArrays::from_columns(current, pwm).map_err(CalibrationError::from)?;
    write_c_sources(&arrays, prefix, values_per_line)
}

/// Render `arrays` to `<prefix>.h` and `<prefix>.c`.
pub fn write_c_sources(
    arrays: &LutArrays,
    prefix: &Path,
    values_per_line: usize,
) -> Result<EmittedFiles, PipelineError> {
    let stem = prefix
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::InvalidPrefix(prefix.to_path_buf()))?;

    let CSources { header, source } =
        emit_c_sources(arrays, &stem, values_per_line).map_err(CalibrationError::from)?;

    let header_path = with_suffix(prefix, ".h");
    let source_path = with_suffix(prefix, ".c");
    if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    std::fs::write(&header_path, header).map_err(|e| PipelineError::io(&header_path, e))?;
    std::fs::write(&source_path, source).map_err(|e| PipelineError::io(&source_path, e))?;

    tracing::info!(
        header = %header_path.display(),
        source = %source_path.display(),
        steps = arrays.steps(),
        "Wrote C sources"
    );
    Ok(EmittedFiles {
        header: header_path,
        source: source_path,
        steps: arrays.steps(),
    })
}

/// `prefix` with `suffix` appended to the file name; unlike
/// `Path::with_extension` this keeps dots already in the prefix.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// Logs each stage of a calibration run as soon as it completes.
#[derive(Debug, Clone, Copy)]
pub struct StageLogger {
    /// Lines in the log being calibrated.
    pub lines: usize,
}

impl StageObserver for StageLogger {
    fn parsed(&mut self, samples: &[RawSample]) {
        log_parse(self.lines, samples);
    }

    fn synchronized(&mut self, report: &SyncReport) {
        log_sync(report);
    }

    fn joined(&mut self, report: &JoinReport) {
        log_join(report);
    }

    fn red_approximated(&mut self, red: &RedApproximation) {
        log_red(red);
    }

    fn solved(&mut self, table: &CalibrationTable) {
        log_table(table);
    }
}

fn log_parse(lines: usize, samples: &[RawSample]) {
    let incomplete = samples.iter().filter(|s| s.reading().is_none()).count();
    tracing::info!(lines, samples = samples.len(), incomplete, "Parsed log");
    if samples.is_empty() {
        tracing::warn!("No sensor samples found; check log.tag");
    }
}

fn log_sync(report: &SyncReport) {
    for index in &report.incomplete {
        tracing::warn!(sample = index, "Dropping sample with a missing channel");
    }
    if let Some(t) = &report.truncated {
        tracing::warn!(
            start = t.start,
            available = t.available,
            "Final series truncated by end of log"
        );
    }
    tracing::info!(
        rows = report.rows.len(),
        data_start = report.data_start,
        last_current = report.last_current(),
        "Synchronized samples"
    );
}

fn log_join(report: &JoinReport) {
    for diagnostic in &report.diagnostics {
        match diagnostic {
            JoinDiagnostic::Incomplete { .. } => {
                tracing::warn!(%diagnostic, "Dropping current")
            }
            _ => tracing::warn!(%diagnostic, "Skipped or replaced row"),
        }
    }
    tracing::info!(
        triplets = report.triplets.len(),
        rejected = report.rejected_rows(),
        dropped = report.dropped_currents(),
        "Joined triplets"
    );
}

fn log_red(red: &RedApproximation) {
    let calibration = &red.calibration;
    tracing::info!(
        index = calibration.index,
        current = calibration.current,
        ratio_r = calibration.ratios.r,
        ratio_l = calibration.ratios.reference,
        approximated = red.replacements.len(),
        "Red calibration point"
    );
    for replacement in red.replacements.iter().take(LOGGED_REPLACEMENTS) {
        tracing::debug!(
            current = replacement.current,
            original = replacement.original.r,
            approximated = replacement.approximated.r,
            "Approximated red reading"
        );
    }
}

fn log_table(table: &CalibrationTable) {
    if table.brightness_limit() <= 0.0 {
        tracing::warn!("Brightness limit is 0; every step solves to off");
    }
    tracing::info!(
        steps = table.len(),
        brightness_limit = table.brightness_limit(),
        pwm_mode = %table.pwm_mode(),
        "Solved calibration table"
    );
}
