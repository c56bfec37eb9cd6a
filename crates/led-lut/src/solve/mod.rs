//! Brightness-balanced current and PWM solver.
//!
//! The three LEDs have different maximum luminances. The solver picks the
//! weakest one's maximum as 100 % brightness ([`CalibrationTable::brightness_limit`])
//! so every step can be reached by all three channels, then for each
//! brightness step:
//!
//! 1. inverts each LED's [`LuminanceCurve`] to find the fractional current
//!    that produces the target luminance,
//! 2. rounds that current **up**, since the driver only takes integer
//!    currents and a step must never come out darker than its target,
//! 3. derives a PWM duty that dims the overshoot back down.

mod options;
mod table;

pub use options::{PwmMode, SolveOptions, UnknownPwmMode, DEFAULT_STEPS};
pub use table::{CalibrationTable, LutRow};

use std::fmt;

use crate::curve::{curves_from_triplets, CurveError, LuminanceCurve};
use crate::join::JoinedTriplet;
use crate::model::Rgb;

/// Errors of the solver.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// `steps` was zero.
    InvalidStepCount(usize),
    /// A luminance curve could not be built.
    Curve(CurveError),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::InvalidStepCount(steps) => {
                write!(f, "steps must be at least 1, got {}", steps)
            }
            SolveError::Curve(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Curve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CurveError> for SolveError {
    fn from(e: CurveError) -> Self {
        SolveError::Curve(e)
    }
}

/// Brightness percent of step `k` out of `steps`.
///
/// `steps == 1` yields a single 0 % step.
pub fn step_percent(k: usize, steps: usize) -> f64 {
    if steps <= 1 {
        return 0.0;
    }
    100.0 * k as f64 / (steps - 1) as f64
}

/// Solve a calibration table from joined triplets.
///
/// # Example
///
/// ```
/// use led_lut::{solve, JoinedTriplet, Reading, SolveOptions};
///
/// let lit = |l: f64| Reading::new(0.0, 0.0, 0.0, l);
/// let triplets = vec![
///     JoinedTriplet { current: 10, red: lit(50.0), green: lit(80.0), blue: lit(40.0) },
///     JoinedTriplet { current: 20, red: lit(150.0), green: lit(160.0), blue: lit(140.0) },
/// ];
///
/// let table = solve(&triplets, &SolveOptions::new()).unwrap();
/// assert_eq!(table.len(), 101);
/// assert_eq!(table.brightness_limit(), 140.0);
/// assert_eq!(table.rows()[50].drive.r, 12);
/// assert_eq!(table.rows()[50].pwm.r, 255);
/// ```
pub fn solve(
    triplets: &[JoinedTriplet],
    options: &SolveOptions,
) -> Result<CalibrationTable, SolveError> {
    let curves = curves_from_triplets(triplets)?;
    solve_curves(&curves, options)
}

/// Solve a calibration table from already built curves.
pub fn solve_curves(
    curves: &Rgb<LuminanceCurve>,
    options: &SolveOptions,
) -> Result<CalibrationTable, SolveError> {
    if options.steps == 0 {
        return Err(SolveError::InvalidStepCount(options.steps));
    }

    let limit = curves
        .r
        .last_luminance()
        .min(curves.g.last_luminance())
        .min(curves.b.last_luminance());

    let rows = (0..options.steps)
        .map(|k| {
            let percent = step_percent(k, options.steps);
            solve_row(curves, percent, limit, options.pwm_mode)
        })
        .collect();

    Ok(CalibrationTable::new(rows, limit, options.pwm_mode))
}

fn solve_row(
    curves: &Rgb<LuminanceCurve>,
    percent: f64,
    limit: f64,
    mode: PwmMode,
) -> LutRow {
    if percent <= 0.0 {
        return LutRow::OFF;
    }

    let target = percent / 100.0 * limit;
    let exact = curves.map_ref(|curve| curve.invert(target));
    let drive = exact.map(round_up_drive);
    let pwm = Rgb::from_fn(|led| {
        let duty = match mode {
            PwmMode::Luminance => {
                let actual = curves[led].evaluate(drive[led] as f64);
                if actual > 0.0 {
                    target / actual
                } else {
                    0.0
                }
            }
            PwmMode::Current => {
                if drive[led] > 0 {
                    exact[led] / drive[led] as f64
                } else {
                    0.0
                }
            }
        };
        duty_to_pwm(duty)
    });

    LutRow {
        percent: percent.round_ties_even() as u8,
        drive,
        pwm,
        exact_current: exact.map(round_to_4_decimals),
    }
}

/// Round to 4 decimals on the exact decimal value, so `0.12345` (stored
/// slightly above the tie) becomes `0.1235`. Scaling by `1e4` first would
/// land below the tie and round down.
fn round_to_4_decimals(value: f64) -> f64 {
    format!("{value:.4}").parse().unwrap_or(value)
}

/// Smallest integer current not below `exact`, saturated into `u8`.
#[inline]
fn round_up_drive(exact: f64) -> u8 {
    exact.ceil().clamp(0.0, u8::MAX as f64) as u8
}

#[inline]
fn duty_to_pwm(duty: f64) -> u8 {
    (255.0 * duty.clamp(0.0, 1.0))
        .round_ties_even()
        .clamp(0.0, 255.0) as u8
}
