//! Unified error type for the led-lut public API.
//!
//! [`CalibrationError`] wraps the error of every stage for convenient `?`
//! propagation in application code.

use std::fmt;

use crate::curve::CurveError;
use crate::emit::EmitError;
use crate::red::RedError;
use crate::solve::SolveError;
use crate::sync::SyncError;

/// Any failure of a calibration stage.
///
/// # Example
///
/// ```
/// use led_lut::{approximate_red, CalibrationError, JoinedTriplet};
///
/// fn anchor_index(triplets: &[JoinedTriplet]) -> Result<usize, CalibrationError> {
///     Ok(approximate_red(triplets, 300.0)?.calibration.index)
/// }
///
/// assert!(anchor_index(&[]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// The sample stream could not be synchronized.
    Sync(SyncError),
    /// The red channel could not be extrapolated.
    Red(RedError),
    /// A luminance curve could not be built.
    Curve(CurveError),
    /// The table could not be solved.
    Solve(SolveError),
    /// The table could not be rendered as C.
    Emit(EmitError),
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::Sync(err) => write!(f, "sync error: {}", err),
            CalibrationError::Red(err) => write!(f, "red approximation error: {}", err),
            CalibrationError::Curve(err) => write!(f, "curve error: {}", err),
            CalibrationError::Solve(err) => write!(f, "solver error: {}", err),
            CalibrationError::Emit(err) => write!(f, "emit error: {}", err),
        }
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalibrationError::Sync(err) => Some(err),
            CalibrationError::Red(err) => Some(err),
            CalibrationError::Curve(err) => Some(err),
            CalibrationError::Solve(err) => Some(err),
            CalibrationError::Emit(err) => Some(err),
        }
    }
}

impl From<SyncError> for CalibrationError {
    fn from(err: SyncError) -> Self {
        CalibrationError::Sync(err)
    }
}

impl From<RedError> for CalibrationError {
    fn from(err: RedError) -> Self {
        CalibrationError::Red(err)
    }
}

impl From<CurveError> for CalibrationError {
    fn from(err: CurveError) -> Self {
        CalibrationError::Curve(err)
    }
}

impl From<SolveError> for CalibrationError {
    fn from(err: SolveError) -> Self {
        CalibrationError::Solve(err)
    }
}

impl From<EmitError> for CalibrationError {
    fn from(err: EmitError) -> Self {
        CalibrationError::Emit(err)
    }
}
