//! Low-current red channel repair.
//!
//! At small drive currents the red LED's output is below the sensor's noise
//! floor. Its response is therefore replaced by a line through the origin,
//! fitted to the first current where the red reading is trustworthy.

use std::fmt;

use crate::join::JoinedTriplet;
use crate::model::Reading;

/// Errors of the red extrapolation.
#[derive(Debug, Clone, PartialEq)]
pub enum RedError {
    /// No triplet's red reading under the red LED exceeds the threshold.
    NoCalibrationPoint {
        /// Threshold that was searched for
        threshold: f64,
    },
    /// The qualifying triplet has a current that cannot anchor a ratio.
    NonPositiveCurrent {
        /// Index of the qualifying triplet
        index: usize,
        current: u32,
    },
}

impl fmt::Display for RedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedError::NoCalibrationPoint { threshold } => {
                write!(
                    f,
                    "could not find red calibration point: no row with R_R > {}",
                    threshold
                )
            }
            RedError::NonPositiveCurrent { index, current } => {
                write!(
                    f,
                    "red calibration point at row {} has non-positive current {}",
                    index, current
                )
            }
        }
    }
}

impl std::error::Error for RedError {}

/// The trustworthy triplet the extrapolation is anchored on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedCalibration {
    /// Index of the anchor triplet in the input.
    pub index: usize,
    pub current: u32,
    /// Red-LED readings divided by `current`.
    pub ratios: Reading,
}

/// Original and replaced red-LED readings of one triplet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Replacement {
    pub current: u32,
    pub original: Reading,
    pub approximated: Reading,
}

/// Output of [`approximate_red`].
#[derive(Debug, Clone, PartialEq)]
pub struct RedApproximation {
    /// The input triplets with low-current red readings replaced.
    pub triplets: Vec<JoinedTriplet>,
    pub calibration: RedCalibration,
    /// One entry per replaced triplet, in input order.
    pub replacements: Vec<Replacement>,
}

/// Find the first triplet whose red reading under the red LED exceeds
/// `threshold` and derive the per-unit-current ratios from it.
pub fn find_red_calibration(
    triplets: &[JoinedTriplet],
    threshold: f64,
) -> Result<RedCalibration, RedError> {
    let (index, triplet) = triplets
        .iter()
        .enumerate()
        .find(|(_, t)| t.red.r > threshold)
        .ok_or(RedError::NoCalibrationPoint { threshold })?;

    if triplet.current == 0 {
        return Err(RedError::NonPositiveCurrent {
            index,
            current: triplet.current,
        });
    }

    let c = triplet.current as f64;
    let red = &triplet.red;
    Ok(RedCalibration {
        index,
        current: triplet.current,
        ratios: Reading::new(red.r / c, red.g / c, red.b / c, red.reference / c),
    })
}

/// Replace the red-LED readings of every triplet before the calibration
/// point with `current * ratio`.
///
/// The input is expected in increasing current order, as produced by
/// [`join_triplets`](crate::join_triplets). Triplets from the calibration
/// point onwards are passed through unchanged.
///
/// # Example
///
/// ```
/// use led_lut::{approximate_red, JoinedTriplet, Reading};
///
/// let dim = Reading::new(5.0, 1.0, 1.0, 0.01);
/// let triplets = vec![
///     JoinedTriplet { current: 1, red: dim, green: dim, blue: dim },
///     JoinedTriplet { current: 4, red: Reading::new(400.0, 40.0, 8.0, 2.0), green: dim, blue: dim },
/// ];
///
/// let result = approximate_red(&triplets, 300.0).unwrap();
/// assert_eq!(result.calibration.index, 1);
/// assert_eq!(result.triplets[0].red, Reading::new(100.0, 10.0, 2.0, 0.5));
/// ```
pub fn approximate_red(
    triplets: &[JoinedTriplet],
    threshold: f64,
) -> Result<RedApproximation, RedError> {
    let calibration = find_red_calibration(triplets, threshold)?;

    let mut replacements = Vec::with_capacity(calibration.index);
    let triplets = triplets
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if i >= calibration.index {
                return *t;
            }
            let approximated = Reading::scaled(t.current as f64, &calibration.ratios);
            replacements.push(Replacement {
                current: t.current,
                original: t.red,
                approximated,
            });
            JoinedTriplet {
                red: approximated,
                ..*t
            }
        })
        .collect();

    Ok(RedApproximation {
        triplets,
        calibration,
        replacements,
    })
}
