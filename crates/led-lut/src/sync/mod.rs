//! Stream synchronization.
//!
//! The capture rig cycles through four blocks of four samples each:
//!
//! ```text
//! | black x4 | red x4 | green x4 | blue x4 |   one series, current n
//! | black x4 | red x4 | green x4 | blue x4 |   next series, current n+1
//! ```
//!
//! The log carries no markers, so the structure is recovered from the data:
//! a sample that is dark on every channel starts a series, and the second
//! sample of each block is taken as that block's measurement (the first one
//! may still be settling).
//!
//! The very first series is special. The capture starts in the middle of the
//! red block for current 1 without a preceding black block, so it is located
//! by the first green peak instead: the first sample with green above a
//! trigger threshold and above red is the green measurement, and the red one
//! sits exactly one block earlier.

mod error;
mod options;

pub use error::SyncError;
pub use options::{SyncOptions, DEFAULT_MAX_CURRENT};

use crate::model::{Led, RawSample, Reading, SyncedRow};

/// Samples per color block.
pub const BLOCK_LEN: usize = 4;

/// Samples per series (black, red, green, blue).
pub const SERIES_LEN: usize = 4 * BLOCK_LEN;

/// Position of the measured sample inside a block.
pub const MID_IN_BLOCK: usize = 1;

/// A series cut short by the end of the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Index of the black sample that started the series
    pub start: usize,
    /// Samples left from `start` onwards
    pub available: usize,
}

/// Result of a synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// Emitted rows, three per current in red, green, blue order.
    pub rows: Vec<SyncedRow>,
    /// Index (into the complete samples) of the seeded red measurement.
    pub data_start: usize,
    /// Indices (into the input) of samples dropped for a missing channel.
    pub incomplete: Vec<usize>,
    /// Set when synchronization stopped at a series that ran past the end.
    pub truncated: Option<Truncation>,
}

impl SyncReport {
    /// Highest current emitted, or 0 when nothing was emitted.
    pub fn last_current(&self) -> u32 {
        self.rows
            .last()
            .and_then(|row| row.active_drive())
            .map_or(0, |(_, current)| current)
    }

    /// Treat a truncated final series as a structural failure.
    pub fn into_strict(self) -> Result<Self, SyncError> {
        match self.truncated {
            Some(Truncation { start, available }) => {
                Err(SyncError::TruncatedSeries { start, available })
            }
            None => Ok(self),
        }
    }
}

/// A sample with all four channels present.
struct Complete<'a> {
    timestamp: &'a str,
    reading: Reading,
}

/// Recovers current-indexed RGB measurements from a raw sample stream.
///
/// # Example
///
/// ```
/// use led_lut::{Led, RawSample, SyncOptions, Synchronizer};
///
/// fn sample(r: f64, g: f64, b: f64, l: f64) -> RawSample {
///     RawSample { timestamp: String::new(), r: Some(r), g: Some(g), b: Some(b), reference: Some(l) }
/// }
///
/// // Seeded first series: red, green, blue blocks of four samples each.
/// let mut samples = Vec::new();
/// samples.extend((0..4).map(|_| sample(300.0, 20.0, 10.0, 5.0)));
/// samples.extend((0..4).map(|_| sample(40.0, 900.0, 60.0, 9.0)));
/// samples.extend((0..4).map(|_| sample(10.0, 80.0, 700.0, 4.0)));
///
/// let sync = Synchronizer::new(SyncOptions::new(13.0, 500.0));
/// let report = sync.synchronize(&samples).unwrap();
///
/// assert_eq!(report.data_start, 0);
/// assert_eq!(report.rows.len(), 3);
/// assert_eq!(report.rows[1].active_drive(), Some((Led::Green, 1)));
/// ```
#[derive(Debug, Clone)]
pub struct Synchronizer {
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(options: SyncOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Synchronize a raw sample stream.
    ///
    /// Samples with a missing channel are dropped first and listed in
    /// [`SyncReport::incomplete`]. Fails when the first series cannot be
    /// located; a truncated later series only stops the run.
    pub fn synchronize(&self, samples: &[RawSample]) -> Result<SyncReport, SyncError> {
        let mut incomplete = Vec::new();
        let complete: Vec<Complete<'_>> = samples
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| match sample.reading() {
                Some(reading) => Some(Complete {
                    timestamp: &sample.timestamp,
                    reading,
                }),
                None => {
                    incomplete.push(index);
                    None
                }
            })
            .collect();

        let n = complete.len();
        let data_start = self.find_data_start(&complete)?;
        let max_current = self.options.max_current;

        let mut rows = Vec::new();
        let mut truncated = None;
        let mut current = 1;
        let mut i = data_start;

        if current <= max_current {
            let blue = data_start + 2 * BLOCK_LEN;
            if blue >= n {
                return Err(SyncError::TruncatedSeed {
                    start: data_start,
                    available: n,
                });
            }
            for (k, led) in Led::ALL.into_iter().enumerate() {
                let sample = &complete[data_start + k * BLOCK_LEN];
                rows.push(emit(sample, led, current));
            }
            current += 1;
            i = blue + 1;
        }

        while i < n && current <= max_current {
            let Some(offset) = complete[i..]
                .iter()
                .position(|s| s.reading.is_black(self.options.black_threshold))
            else {
                break;
            };

            let series_start = i + offset;
            if series_start + SERIES_LEN > n {
                truncated = Some(Truncation {
                    start: series_start,
                    available: n - series_start,
                });
                break;
            }

            // Block 0 is the black block; its measurement is not emitted.
            for (k, led) in Led::ALL.into_iter().enumerate() {
                let index = series_start + (k + 1) * BLOCK_LEN + MID_IN_BLOCK;
                rows.push(emit(&complete[index], led, current));
            }
            current += 1;
            i = series_start + SERIES_LEN;
        }

        Ok(SyncReport {
            rows,
            data_start,
            incomplete,
            truncated,
        })
    }

    fn find_data_start(&self, samples: &[Complete<'_>]) -> Result<usize, SyncError> {
        let threshold = self.options.green_trigger_threshold;
        let trigger = samples
            .iter()
            .position(|s| s.reading.g > threshold && s.reading.g > s.reading.r)
            .ok_or(SyncError::NoTrigger { threshold })?;

        trigger
            .checked_sub(BLOCK_LEN)
            .ok_or_else(|| SyncError::TriggerTooEarly {
                index: trigger,
                timestamp: samples[trigger].timestamp.to_string(),
            })
    }
}

fn emit(sample: &Complete<'_>, led: Led, current: u32) -> SyncedRow {
    SyncedRow::single(sample.timestamp, led, current, sample.reading)
}
