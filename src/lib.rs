//! ledcal - LED calibration lookup tables
//!
//! Turns the serial log of a calibration rig into the brightness tables the
//! LED firmware links against. The algorithms live in the `led-lut` crate;
//! this crate adds configuration, the CSV intermediates and the stage
//! commands. This library exposes modules for integration testing.

pub mod error;
pub mod models;
pub mod services;
