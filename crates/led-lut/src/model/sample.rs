//! Sensor samples as they flow between the early pipeline stages.

use super::led::{Led, Rgb};

/// One photometric reading: the three color channels plus the wide-band
/// reference channel of the sensor.
///
/// The reference channel is the luminance proxy that the solver balances on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub reference: f64,
}

impl Reading {
    #[inline]
    pub const fn new(r: f64, g: f64, b: f64, reference: f64) -> Self {
        Self { r, g, b, reference }
    }

    /// Whether all four channels are strictly below `threshold`.
    ///
    /// The rig switches every LED off between series, so a sample that is dark
    /// on every channel marks the start of a new series.
    ///
    /// ```
    /// use led_lut::Reading;
    ///
    /// assert!(Reading::new(12.0, 10.0, 11.0, 9.0).is_black(13.0));
    /// assert!(!Reading::new(14.0, 10.0, 11.0, 9.0).is_black(13.0));
    /// ```
    #[inline]
    pub fn is_black(&self, threshold: f64) -> bool {
        self.r < threshold && self.g < threshold && self.b < threshold && self.reference < threshold
    }

    /// Multiply every channel by the matching factor.
    pub fn scaled(current: f64, ratios: &Reading) -> Self {
        Self {
            r: current * ratios.r,
            g: current * ratios.g,
            b: current * ratios.b,
            reference: current * ratios.reference,
        }
    }
}

/// A parsed log sample; channels the sensor reported as `nan` are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: String,
    pub r: Option<f64>,
    pub g: Option<f64>,
    pub b: Option<f64>,
    pub reference: Option<f64>,
}

impl RawSample {
    /// The complete reading, or `None` if any channel is missing.
    pub fn reading(&self) -> Option<Reading> {
        Some(Reading {
            r: self.r?,
            g: self.g?,
            b: self.b?,
            reference: self.reference?,
        })
    }
}

/// A synchronized measurement: one LED driven at one current.
///
/// `drive` holds the current applied to each LED. Rows produced by the
/// synchronizer always have exactly one non-zero entry; rows read back from a
/// table may not, which is why the joiner validates them with
/// [`SyncedRow::active_drive`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedRow {
    pub timestamp: String,
    pub drive: Rgb<u32>,
    pub measured: Reading,
}

impl SyncedRow {
    /// Row for `led` lit at `current` with every other LED off.
    pub fn single(timestamp: impl Into<String>, led: Led, current: u32, measured: Reading) -> Self {
        let mut drive = Rgb::default();
        drive[led] = current;
        Self {
            timestamp: timestamp.into(),
            drive,
            measured,
        }
    }

    /// The LED under test and its current, if exactly one LED is driven.
    pub fn active_drive(&self) -> Option<(Led, u32)> {
        let mut active = Led::ALL.into_iter().filter(|&led| self.drive[led] > 0);
        let led = active.next()?;
        if active.next().is_some() {
            return None;
        }
        Some((led, self.drive[led]))
    }
}
