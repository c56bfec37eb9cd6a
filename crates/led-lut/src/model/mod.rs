//! Data types shared by the pipeline stages.

mod led;
mod sample;

pub use led::{Led, Rgb};
pub use sample::{RawSample, Reading, SyncedRow};
