//! Public API for the led-lut crate.
//!
//! This module provides the high-level API: the [`Calibrator`] builder and
//! the [`CalibrationError`] unified error type.

mod calibrator;
mod error;

pub use calibrator::{Calibration, Calibrator, StageObserver};
pub use error::CalibrationError;
