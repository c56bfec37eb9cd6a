//! Solver options and configuration.

use std::fmt;
use std::str::FromStr;

/// Number of table rows when nothing else is configured (0..=100 percent).
pub const DEFAULT_STEPS: usize = 101;

/// How the PWM duty that corrects the rounded-up drive current is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PwmMode {
    /// `target / L(drive)`, evaluated on the channel's luminance curve.
    #[default]
    Luminance,
    /// `exact / drive`, assuming luminance is proportional to current.
    Current,
}

impl PwmMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PwmMode::Luminance => "luminance",
            PwmMode::Current => "current",
        }
    }
}

impl fmt::Display for PwmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognized PWM mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPwmMode(pub String);

impl fmt::Display for UnknownPwmMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown PWM mode '{}' (expected 'luminance' or 'current')",
            self.0
        )
    }
}

impl std::error::Error for UnknownPwmMode {}

impl FromStr for PwmMode {
    type Err = UnknownPwmMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "luminance" => Ok(PwmMode::Luminance),
            "current" => Ok(PwmMode::Current),
            _ => Err(UnknownPwmMode(s.to_string())),
        }
    }
}

/// Configuration for [`solve`](super::solve).
///
/// # Defaults
///
/// - Steps: 101 (one row per percent)
/// - PWM mode: [`PwmMode::Luminance`]
///
/// # Example
///
/// ```
/// use led_lut::{PwmMode, SolveOptions};
///
/// let options = SolveOptions::new().steps(11).pwm_mode(PwmMode::Current);
/// assert_eq!(options.steps, 11);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Number of brightness rows, evenly spread over 0..=100 percent.
    ///
    /// Default: `101`
    pub steps: usize,

    /// Duty cycle computation.
    ///
    /// Default: `PwmMode::Luminance`
    pub pwm_mode: PwmMode,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            pwm_mode: PwmMode::default(),
        }
    }
}

impl SolveOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of table rows (must be at least 1).
    #[inline]
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Set the PWM duty computation.
    #[inline]
    pub fn pwm_mode(mut self, mode: PwmMode) -> Self {
        self.pwm_mode = mode;
        self
    }
}
