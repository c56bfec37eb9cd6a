//! Structural failures of stream synchronization.

use std::fmt;

/// The sample stream does not have the structure the rig produces.
///
/// Indices refer to the sequence of complete samples (samples with a missing
/// channel are removed before synchronization).
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// No sample has green above the trigger threshold and above red.
    NoTrigger {
        /// Threshold that was searched for
        threshold: f64,
    },
    /// The trigger was found but fewer than four samples precede it.
    TriggerTooEarly {
        /// Index of the trigger sample
        index: usize,
        /// Timestamp of the trigger sample
        timestamp: String,
    },
    /// The seeded first series runs past the end of the stream.
    TruncatedSeed {
        /// Index of the red sample of the seeded series
        start: usize,
        /// Number of complete samples in the stream
        available: usize,
    },
    /// A series ran past the end of the stream.
    ///
    /// Only returned by [`SyncReport::into_strict`](super::SyncReport::into_strict);
    /// the synchronizer itself records this in its report and stops.
    TruncatedSeries {
        /// Index of the black sample starting the series
        start: usize,
        /// Samples left from `start` onwards
        available: usize,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NoTrigger { threshold } => {
                write!(
                    f,
                    "could not find data start: no sample with G > {} and G > R",
                    threshold
                )
            }
            SyncError::TriggerTooEarly { index, timestamp } => {
                write!(
                    f,
                    "trigger at sample {} ({}) has fewer than 4 samples before it",
                    index, timestamp
                )
            }
            SyncError::TruncatedSeed { start, available } => {
                write!(
                    f,
                    "stream too short to seed first series at sample {} (have {} samples, need {})",
                    start,
                    available,
                    start + 9
                )
            }
            SyncError::TruncatedSeries { start, available } => {
                write!(
                    f,
                    "series at sample {} is truncated: need 16 samples, have {}",
                    start, available
                )
            }
        }
    }
}

impl std::error::Error for SyncError {}
