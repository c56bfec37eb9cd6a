//! The solved calibration table and its runtime lookup.

use super::options::PwmMode;
use crate::model::Rgb;

/// One brightness step of the calibration table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LutRow {
    /// Brightness in percent, rounded to an integer.
    pub percent: u8,
    /// Integer drive current per LED, never below `exact_current`.
    pub drive: Rgb<u8>,
    /// PWM dim value per LED (0..=255) compensating the rounded-up drive.
    pub pwm: Rgb<u8>,
    /// Fractional current that reaches the target, rounded to 4 decimals.
    pub exact_current: Rgb<f64>,
}

impl LutRow {
    /// The all-off row used for 0 percent.
    pub const OFF: LutRow = LutRow {
        percent: 0,
        drive: Rgb::new(0, 0, 0),
        pwm: Rgb::new(0, 0, 0),
        exact_current: Rgb::new(0.0, 0.0, 0.0),
    };
}

/// Immutable brightness-to-(current, PWM) table.
///
/// Built by [`solve`](super::solve); row `i` holds the settings for the
/// `i`-th evenly spaced brightness step.
///
/// # Runtime lookup
///
/// [`convert`](Self::convert) mirrors what firmware does with the emitted
/// arrays: an 8-bit brightness selects a row, and each 8-bit color
/// component is scaled by that row's PWM value.
///
/// ```
/// use led_lut::{CalibrationTable, LutRow, PwmMode, Rgb};
///
/// let full = LutRow {
///     percent: 100,
///     drive: Rgb::new(20, 18, 25),
///     pwm: Rgb::new(255, 128, 200),
///     exact_current: Rgb::new(20.0, 17.5, 24.1),
/// };
/// let table = CalibrationTable::new(vec![LutRow::OFF, full], 140.0, PwmMode::Luminance);
///
/// let (current, pwm) = table.convert(Rgb::new(255, 255, 0), 255);
/// assert_eq!(current, Rgb::new(20, 18, 25));
/// assert_eq!(pwm, Rgb::new(255, 128, 0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    rows: Vec<LutRow>,
    brightness_limit: f64,
    pwm_mode: PwmMode,
}

impl CalibrationTable {
    pub fn new(rows: Vec<LutRow>, brightness_limit: f64, pwm_mode: PwmMode) -> Self {
        Self {
            rows,
            brightness_limit,
            pwm_mode,
        }
    }

    #[inline]
    pub fn rows(&self) -> &[LutRow] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Luminance reached at 100 percent (the weakest LED's maximum).
    pub fn brightness_limit(&self) -> f64 {
        self.brightness_limit
    }

    pub fn pwm_mode(&self) -> PwmMode {
        self.pwm_mode
    }

    /// Drive currents of row `index`, or `None` past the end.
    pub fn currents(&self, index: usize) -> Option<Rgb<u8>> {
        self.rows.get(index).map(|row| row.drive)
    }

    /// PWM values of row `index`, or `None` past the end.
    pub fn pwms(&self, index: usize) -> Option<Rgb<u8>> {
        self.rows.get(index).map(|row| row.pwm)
    }

    /// Row selected by an 8-bit brightness.
    ///
    /// Maps `0..=255` onto the rows with rounding and clamps to the last row.
    pub fn index_for_brightness(&self, brightness: u8) -> usize {
        let steps = self.rows.len();
        if steps == 0 {
            return 0;
        }
        let idx = (brightness as usize * steps + steps / 2) / 255;
        idx.min(steps - 1)
    }

    /// Drive currents and per-component PWM for `color` at `brightness`.
    ///
    /// An empty table yields all zeros.
    pub fn convert(&self, color: Rgb<u8>, brightness: u8) -> (Rgb<u8>, Rgb<u8>) {
        let Some(row) = self.rows.get(self.index_for_brightness(brightness)) else {
            return (Rgb::default(), Rgb::default());
        };
        let pwm = Rgb::from_fn(|led| scale_component(color[led], row.pwm[led]));
        (row.drive, pwm)
    }
}

/// `color * dim / 255`, rounded to nearest.
#[inline]
fn scale_component(color: u8, dim: u8) -> u8 {
    ((color as u32 * dim as u32 + 127) / 255) as u8
}
