//! Synchronizer configuration.

/// Highest current the rig can drive (8-bit current register).
pub const DEFAULT_MAX_CURRENT: u32 = 255;

/// Thresholds and limits for [`Synchronizer`](super::Synchronizer).
///
/// The two thresholds depend on the sensor, the optics and the ambient light
/// of the capture rig, so they have no defaults and must be supplied by the
/// caller.
///
/// # Example
///
/// ```
/// use led_lut::SyncOptions;
///
/// let options = SyncOptions::new(13.0, 500.0).max_current(64);
/// assert_eq!(options.max_current, 64);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// A sample is "black" when all four channels are strictly below this.
    pub black_threshold: f64,

    /// Green reading that identifies the first green block peak.
    pub green_trigger_threshold: f64,

    /// Stop after emitting this current.
    ///
    /// Default: `255`
    pub max_current: u32,
}

impl SyncOptions {
    pub fn new(black_threshold: f64, green_trigger_threshold: f64) -> Self {
        Self {
            black_threshold,
            green_trigger_threshold,
            max_current: DEFAULT_MAX_CURRENT,
        }
    }

    /// Set the last current to emit.
    #[inline]
    pub fn max_current(mut self, max_current: u32) -> Self {
        self.max_current = max_current;
        self
    }
}
