//! Monotone piecewise-linear luminance curves.
//!
//! A [`LuminanceCurve`] maps drive current to the luminance measured on the
//! sensor's reference channel. Raw measurements are noisy and occasionally
//! dip as current rises; construction sorts them, merges repeated currents
//! and applies a running maximum so the curve is non-decreasing and can be
//! inverted.

use std::fmt;

use crate::join::JoinedTriplet;
use crate::model::{Led, Rgb};

/// Slope below which a segment is treated as flat when inverting.
const FLAT_EPSILON: f64 = 1e-12;

/// Tolerance on the upper end of a segment when bracketing a target.
const BRACKET_EPSILON: f64 = 1e-15;

/// A measurement point could not be used to build a curve.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveError {
    /// A current or luminance is NaN or infinite.
    NonFinite {
        /// Position of the offending point in the input
        index: usize,
        current: f64,
        luminance: f64,
    },
    /// A current is negative.
    NegativeCurrent { index: usize, current: f64 },
}

impl fmt::Display for CurveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveError::NonFinite {
                index,
                current,
                luminance,
            } => write!(
                f,
                "curve point {} is not finite (current={}, luminance={})",
                index, current, luminance
            ),
            CurveError::NegativeCurrent { index, current } => {
                write!(f, "curve point {} has negative current {}", index, current)
            }
        }
    }
}

impl std::error::Error for CurveError {}

/// Non-decreasing luminance as a function of drive current.
///
/// Invariants after construction:
/// - there is at least one point
/// - currents are strictly increasing
/// - luminances are non-decreasing
/// - the first point is at current 0 when no measurement at 0 exists, with
///   luminance 0
///
/// # Example
///
/// ```
/// use led_lut::LuminanceCurve;
///
/// let curve = LuminanceCurve::from_points(&[(20.0, 150.0), (10.0, 50.0)]).unwrap();
/// assert_eq!(curve.points(), &[(0.0, 0.0), (10.0, 50.0), (20.0, 150.0)]);
/// assert!((curve.invert(70.0) - 12.0).abs() < 1e-12);
/// assert!((curve.evaluate(12.0) - 70.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LuminanceCurve {
    points: Vec<(f64, f64)>,
}

impl LuminanceCurve {
    /// Build a curve from `(current, luminance)` measurements in any order.
    ///
    /// Repeated currents keep the largest luminance. An empty input yields
    /// the single point `(0, 0)`.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self, CurveError> {
        for (index, &(current, luminance)) in points.iter().enumerate() {
            if !current.is_finite() || !luminance.is_finite() {
                return Err(CurveError::NonFinite {
                    index,
                    current,
                    luminance,
                });
            }
            if current < 0.0 {
                return Err(CurveError::NegativeCurrent { index, current });
            }
        }

        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len() + 1);
        for (current, luminance) in sorted {
            match merged.last_mut() {
                Some(last) if last.0 == current => last.1 = last.1.max(luminance),
                _ => merged.push((current, luminance)),
            }
        }

        let mut running = f64::NEG_INFINITY;
        for point in &mut merged {
            running = running.max(point.1);
            point.1 = running;
        }

        match merged.first() {
            Some(&(first, _)) if first > 0.0 => merged.insert(0, (0.0, 0.0)),
            None => merged.push((0.0, 0.0)),
            _ => {}
        }

        Ok(Self { points: merged })
    }

    /// Curve of `led` from the reference readings of joined triplets.
    pub fn from_triplets(triplets: &[JoinedTriplet], led: Led) -> Result<Self, CurveError> {
        let points: Vec<(f64, f64)> = triplets
            .iter()
            .map(|t| (t.current as f64, t.response(led).reference))
            .collect();
        Self::from_points(&points)
    }

    /// The normalized `(current, luminance)` points.
    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Luminance at the highest measured current.
    pub fn last_luminance(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.1)
    }

    /// Current needed to reach `target` luminance.
    ///
    /// Targets at or below zero or the first luminance return the first
    /// current, targets at or above the last luminance return the last
    /// current. On a flat segment the segment's lower current is returned.
    pub fn invert(&self, target: f64) -> f64 {
        let (x_first, y_first) = self.points[0];
        let (x_last, y_last) = self.points[self.points.len() - 1];

        if target <= 0.0 || target <= y_first {
            return x_first;
        }
        if target >= y_last {
            return x_last;
        }

        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if target <= y1 + BRACKET_EPSILON {
                if y1 <= y0 + FLAT_EPSILON {
                    return x0;
                }
                return x0 + (target - y0) / (y1 - y0) * (x1 - x0);
            }
        }
        x_last
    }

    /// Luminance at `current`, clamped to the ends of the curve.
    pub fn evaluate(&self, current: f64) -> f64 {
        let (x_first, y_first) = self.points[0];
        let (x_last, y_last) = self.points[self.points.len() - 1];

        if current <= x_first {
            return y_first;
        }
        if current >= x_last {
            return y_last;
        }

        // First point with x >= current; exists and is > 0 after the checks above.
        let hi = self.points.partition_point(|p| p.0 < current);
        let (x0, y0) = self.points[hi - 1];
        let (x1, y1) = self.points[hi];
        if x1 == x0 {
            return y1;
        }
        y0 + (current - x0) / (x1 - x0) * (y1 - y0)
    }
}

/// Build the three LED curves from joined triplets.
pub fn curves_from_triplets(
    triplets: &[JoinedTriplet],
) -> Result<Rgb<LuminanceCurve>, CurveError> {
    Rgb::try_from_fn(|led| LuminanceCurve::from_triplets(triplets, led))
}
