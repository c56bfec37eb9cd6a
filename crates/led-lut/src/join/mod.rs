//! Regrouping of single-LED rows into one triplet per drive current.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Led, Reading, Rgb, SyncedRow};

/// Sensor responses under each of the three LEDs at one drive current.
///
/// `red.reference` is the reference-channel reading while only the red LED
/// was lit, `green.r` the red-channel reading while only green was lit, and
/// so on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedTriplet {
    /// Drive current shared by the three measurements (always > 0).
    pub current: u32,
    pub red: Reading,
    pub green: Reading,
    pub blue: Reading,
}

impl JoinedTriplet {
    /// Measurement taken while `led` was lit.
    pub fn response(&self, led: Led) -> &Reading {
        match led {
            Led::Red => &self.red,
            Led::Green => &self.green,
            Led::Blue => &self.blue,
        }
    }
}

/// Something the joiner skipped or overwrote.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinDiagnostic {
    /// Input row `index` does not drive exactly one LED.
    AmbiguousDrive { index: usize, drive: Rgb<u32> },
    /// Input row `index` repeats a (current, LED) pair and replaced the
    /// earlier measurement.
    Duplicate { index: usize, current: u32, led: Led },
    /// No triplet was emitted for `current` because LEDs were not measured.
    Incomplete { current: u32, missing: Vec<Led> },
}

impl fmt::Display for JoinDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinDiagnostic::AmbiguousDrive { index, drive } => write!(
                f,
                "row {}: expected exactly one driven LED, got R={}, G={}, B={}",
                index, drive.r, drive.g, drive.b
            ),
            JoinDiagnostic::Duplicate {
                index,
                current,
                led,
            } => write!(
                f,
                "row {}: duplicate {} entry for current={}, overwriting previous value",
                index, led, current
            ),
            JoinDiagnostic::Incomplete { current, missing } => {
                let missing: Vec<String> = missing.iter().map(Led::to_string).collect();
                write!(
                    f,
                    "current {}: missing measurements for {}",
                    current,
                    missing.join(",")
                )
            }
        }
    }
}

/// Triplets plus everything that was skipped on the way.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinReport {
    /// Complete triplets in increasing current order.
    pub triplets: Vec<JoinedTriplet>,
    pub diagnostics: Vec<JoinDiagnostic>,
}

impl JoinReport {
    /// Number of input rows that were rejected outright.
    pub fn rejected_rows(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, JoinDiagnostic::AmbiguousDrive { .. }))
            .count()
    }

    /// Number of currents dropped for missing members.
    pub fn dropped_currents(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, JoinDiagnostic::Incomplete { .. }))
            .count()
    }
}

/// Group rows by drive current into [`JoinedTriplet`]s.
///
/// A later row for the same (current, LED) pair replaces the earlier one.
/// Currents that end up without all three LEDs are dropped.
///
/// # Example
///
/// ```
/// use led_lut::{join_triplets, Led, Reading, SyncedRow};
///
/// let rows = vec![
///     SyncedRow::single("a", Led::Red, 5, Reading::new(1.0, 0.0, 0.0, 1.0)),
///     SyncedRow::single("b", Led::Green, 5, Reading::new(0.0, 2.0, 0.0, 2.0)),
///     SyncedRow::single("c", Led::Blue, 5, Reading::new(0.0, 0.0, 3.0, 3.0)),
///     SyncedRow::single("d", Led::Red, 6, Reading::new(1.0, 0.0, 0.0, 1.0)),
/// ];
///
/// let report = join_triplets(&rows);
/// assert_eq!(report.triplets.len(), 1);
/// assert_eq!(report.triplets[0].current, 5);
/// assert_eq!(report.dropped_currents(), 1);
/// ```
pub fn join_triplets(rows: &[SyncedRow]) -> JoinReport {
    let mut groups: BTreeMap<u32, Rgb<Option<Reading>>> = BTreeMap::new();
    let mut diagnostics = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let Some((led, current)) = row.active_drive() else {
            diagnostics.push(JoinDiagnostic::AmbiguousDrive {
                index,
                drive: row.drive,
            });
            continue;
        };

        let slot = &mut groups.entry(current).or_default()[led];
        if slot.is_some() {
            diagnostics.push(JoinDiagnostic::Duplicate {
                index,
                current,
                led,
            });
        }
        *slot = Some(row.measured);
    }

    let mut triplets = Vec::with_capacity(groups.len());
    for (current, group) in groups {
        match (group.r, group.g, group.b) {
            (Some(red), Some(green), Some(blue)) => triplets.push(JoinedTriplet {
                current,
                red,
                green,
                blue,
            }),
            _ => {
                let missing = Led::ALL
                    .into_iter()
                    .filter(|&led| group[led].is_none())
                    .collect();
                diagnostics.push(JoinDiagnostic::Incomplete { current, missing });
            }
        }
    }

    JoinReport {
        triplets,
        diagnostics,
    }
}
