//! led-lut: LED calibration lookup tables from photometric sensor logs
//!
//! This library turns the log of a tri-color LED calibration capture into
//! firmware lookup tables that map a brightness step to a drive current and
//! a PWM dim value per LED, such that all three LEDs reach the same luminance
//! at every step.
//!
//! # Quick Start
//!
//! The [`Calibrator`] builder runs the whole chain:
//!
//! ```no_run
//! use led_lut::{emit, Calibrator, SyncOptions};
//!
//! let log = std::fs::read_to_string("capture.log").unwrap();
//!
//! let calibrator = Calibrator::new(SyncOptions::new(13.0, 500.0), 300.0);
//! let calibration = calibrator.run(log.lines()).unwrap();
//!
//! let arrays = emit::LutArrays::from_table(&calibration.table);
//! let files = emit::emit_c_sources(&arrays, "led_cal", 16).unwrap();
//! std::fs::write("led_cal.h", files.header).unwrap();
//! std::fs::write("led_cal.c", files.source).unwrap();
//! ```
//!
//! # Pipeline
//!
//! ```text
//! log lines
//!     |
//!     v
//! LogParser            (grammar per line, `nan` kept as missing)
//!     |  RawSample
//!     v
//! Synchronizer         (recover black/red/green/blue series)
//!     |  SyncedRow: one LED at one current
//!     v
//! join_triplets        (group by current, drop incomplete)
//!     |  JoinedTriplet: red, green, blue responses at one current
//!     v
//! approximate_red      (replace noisy low-current red readings)
//!     |
//!     v
//! solve                (luminance curves, ceiling current, PWM)
//!     |  CalibrationTable
//!     v
//! emit                 (C header and source)
//! ```
//!
//! Every stage is a pure function of its input and options. Identical input
//! yields byte-identical output, which matters because the table is compiled
//! into firmware.
//!
//! # Capture Structure
//!
//! The rig steps the drive current from 1 upwards. At each current it shows
//! four blocks of four sensor samples: all LEDs off, then red, green and blue
//! alone. The log has no markers; the [`Synchronizer`] finds the first green
//! peak to locate current 1 and uses all-dark samples to find each later
//! series.
//!
//! # Balancing
//!
//! The luminance used for balancing is the sensor's wide-band reference
//! channel. The weakest LED's maximum defines 100 % brightness. For each step
//! the solver finds the fractional current giving the target luminance on
//! each LED's [`LuminanceCurve`], rounds it up to the next integer (a step
//! must never be darker than requested) and computes a PWM duty that dims the
//! overshoot. Two duty models are available, see [`PwmMode`].

pub mod api;
pub mod curve;
pub mod emit;
pub mod join;
pub mod model;
pub mod parse;
pub mod red;
pub mod solve;
pub mod sync;

#[cfg(test)]
mod domain_tests;

pub use api::{Calibration, CalibrationError, Calibrator, StageObserver};
pub use curve::{curves_from_triplets, CurveError, LuminanceCurve};
pub use emit::{EmitError, LutArrays};
pub use join::{join_triplets, JoinDiagnostic, JoinReport, JoinedTriplet};
pub use model::{Led, RawSample, Reading, Rgb, SyncedRow};
pub use parse::{LineMatch, LogParser};
pub use red::{approximate_red, RedApproximation, RedCalibration, RedError};
pub use solve::{solve, solve_curves, CalibrationTable, LutRow, PwmMode, SolveError, SolveOptions};
pub use sync::{SyncError, SyncOptions, SyncReport, Synchronizer, Truncation};
