//! Row types of the CSV intermediates.
//!
//! Column names are written in their canonical case and matched
//! case-insensitively when read: the reader lower-cases every header before
//! deserializing, which is why each field carries a lower-case
//! `deserialize` name.

use led_lut::{JoinedTriplet, LutRow, RawSample, Reading, Rgb, SyncedRow};
use serde::{Deserialize, Deserializer, Serialize};

/// A row type with a fixed CSV layout.
pub trait TableRecord: Serialize + for<'de> Deserialize<'de> {
    /// Human readable table name for diagnostics.
    const NAME: &'static str;

    /// Column names as written.
    const HEADER: &'static [&'static str];

    /// Columns that must be present when reading (compared case-insensitively).
    const REQUIRED: &'static [&'static str];
}

/// Drive values at or below this (negative ones included) mean the LED is off.
const DRIVE_EPSILON: f64 = 1e-12;

/// Accept a current written as an integer or a float.
///
/// Values at or below [`DRIVE_EPSILON`] and NaN read as 0 (off). Anything
/// else is rounded half to even and must come out positive, so `0.5` is
/// rejected rather than taken as current 1.
fn current_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() || value <= DRIVE_EPSILON {
        return Ok(0);
    }
    if value.is_infinite() {
        return Err(serde::de::Error::custom("drive current is infinite"));
    }
    let rounded = value.round_ties_even();
    if rounded < 1.0 {
        return Err(serde::de::Error::custom(format!(
            "non-positive current {rounded} (from {value})"
        )));
    }
    Ok(rounded.min(u32::MAX as f64) as u32)
}

/// Accept only finite measurements.
fn finite_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!(
            "measurement {value} is not finite"
        )));
    }
    Ok(value)
}

/// Accept an 8-bit table value written as any number, rounding half to even
/// and clamping into `0..=255`.
fn byte_from_number<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() {
        return Err(serde::de::Error::custom("value is NaN"));
    }
    Ok(value.round_ties_even().clamp(0.0, 255.0) as u8)
}

/// Parsed log sample (`timestamp,R,G,B,luminosity`); missing channels are
/// empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: String,
    #[serde(rename(serialize = "R", deserialize = "r"))]
    pub r: Option<f64>,
    #[serde(rename(serialize = "G", deserialize = "g"))]
    pub g: Option<f64>,
    #[serde(rename(serialize = "B", deserialize = "b"))]
    pub b: Option<f64>,
    pub luminosity: Option<f64>,
}

impl TableRecord for SampleRecord {
    const NAME: &'static str = "samples";
    const HEADER: &'static [&'static str] = &["timestamp", "R", "G", "B", "luminosity"];
    const REQUIRED: &'static [&'static str] = &["timestamp", "R", "G", "B", "luminosity"];
}

impl From<&RawSample> for SampleRecord {
    fn from(sample: &RawSample) -> Self {
        Self {
            timestamp: sample.timestamp.clone(),
            r: sample.r,
            g: sample.g,
            b: sample.b,
            luminosity: sample.reference,
        }
    }
}

impl From<SampleRecord> for RawSample {
    fn from(record: SampleRecord) -> Self {
        // CSV writers disagree on how to spell NaN; treat any of them as missing.
        let present = |v: Option<f64>| v.filter(|v| !v.is_nan());
        RawSample {
            timestamp: record.timestamp,
            r: present(record.r),
            g: present(record.g),
            b: present(record.b),
            reference: present(record.luminosity),
        }
    }
}

/// Synchronized row
/// (`timestamp,Current_R,Current_G,Current_B,R,G,B,luminosity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedRecord {
    pub timestamp: String,
    #[serde(
        rename(serialize = "Current_R", deserialize = "current_r"),
        deserialize_with = "current_from_number"
    )]
    pub current_r: u32,
    #[serde(
        rename(serialize = "Current_G", deserialize = "current_g"),
        deserialize_with = "current_from_number"
    )]
    pub current_g: u32,
    #[serde(
        rename(serialize = "Current_B", deserialize = "current_b"),
        deserialize_with = "current_from_number"
    )]
    pub current_b: u32,
    #[serde(rename(serialize = "R", deserialize = "r"))]
    pub r: f64,
    #[serde(rename(serialize = "G", deserialize = "g"))]
    pub g: f64,
    #[serde(rename(serialize = "B", deserialize = "b"))]
    pub b: f64,
    pub luminosity: f64,
}

impl TableRecord for SyncedRecord {
    const NAME: &'static str = "synced";
    const HEADER: &'static [&'static str] = &[
        "timestamp",
        "Current_R",
        "Current_G",
        "Current_B",
        "R",
        "G",
        "B",
        "luminosity",
    ];
    const REQUIRED: &'static [&'static str] = Self::HEADER;
}

impl From<&SyncedRow> for SyncedRecord {
    fn from(row: &SyncedRow) -> Self {
        Self {
            timestamp: row.timestamp.clone(),
            current_r: row.drive.r,
            current_g: row.drive.g,
            current_b: row.drive.b,
            r: row.measured.r,
            g: row.measured.g,
            b: row.measured.b,
            luminosity: row.measured.reference,
        }
    }
}

impl From<SyncedRecord> for SyncedRow {
    fn from(record: SyncedRecord) -> Self {
        SyncedRow {
            timestamp: record.timestamp,
            drive: Rgb::new(record.current_r, record.current_g, record.current_b),
            measured: Reading::new(record.r, record.g, record.b, record.luminosity),
        }
    }
}

/// One current with the response under each LED
/// (`Current,R_R,R_G,R_B,R_L,G_R,...,B_L`).
///
/// The first letter names the lit LED, the second the sensor channel
/// (`L` is the reference channel). Rows with a non-finite measurement do not
/// decode and are skipped as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    #[serde(
        rename(serialize = "Current", deserialize = "current"),
        deserialize_with = "current_from_number"
    )]
    pub current: u32,
    #[serde(
        rename(serialize = "R_R", deserialize = "r_r"),
        deserialize_with = "finite_number"
    )]
    pub r_r: f64,
    #[serde(
        rename(serialize = "R_G", deserialize = "r_g"),
        deserialize_with = "finite_number"
    )]
    pub r_g: f64,
    #[serde(
        rename(serialize = "R_B", deserialize = "r_b"),
        deserialize_with = "finite_number"
    )]
    pub r_b: f64,
    #[serde(
        rename(serialize = "R_L", deserialize = "r_l"),
        deserialize_with = "finite_number"
    )]
    pub r_l: f64,
    #[serde(
        rename(serialize = "G_R", deserialize = "g_r"),
        deserialize_with = "finite_number"
    )]
    pub g_r: f64,
    #[serde(
        rename(serialize = "G_G", deserialize = "g_g"),
        deserialize_with = "finite_number"
    )]
    pub g_g: f64,
    #[serde(
        rename(serialize = "G_B", deserialize = "g_b"),
        deserialize_with = "finite_number"
    )]
    pub g_b: f64,
    #[serde(
        rename(serialize = "G_L", deserialize = "g_l"),
        deserialize_with = "finite_number"
    )]
    pub g_l: f64,
    #[serde(
        rename(serialize = "B_R", deserialize = "b_r"),
        deserialize_with = "finite_number"
    )]
    pub b_r: f64,
    #[serde(
        rename(serialize = "B_G", deserialize = "b_g"),
        deserialize_with = "finite_number"
    )]
    pub b_g: f64,
    #[serde(
        rename(serialize = "B_B", deserialize = "b_b"),
        deserialize_with = "finite_number"
    )]
    pub b_b: f64,
    #[serde(
        rename(serialize = "B_L", deserialize = "b_l"),
        deserialize_with = "finite_number"
    )]
    pub b_l: f64,
}

impl TableRecord for JoinedRecord {
    const NAME: &'static str = "joined";
    const HEADER: &'static [&'static str] = &[
        "Current", "R_R", "R_G", "R_B", "R_L", "G_R", "G_G", "G_B", "G_L", "B_R", "B_G", "B_B",
        "B_L",
    ];
    const REQUIRED: &'static [&'static str] = Self::HEADER;
}

impl From<&JoinedTriplet> for JoinedRecord {
    fn from(t: &JoinedTriplet) -> Self {
        Self {
            current: t.current,
            r_r: t.red.r,
            r_g: t.red.g,
            r_b: t.red.b,
            r_l: t.red.reference,
            g_r: t.green.r,
            g_g: t.green.g,
            g_b: t.green.b,
            g_l: t.green.reference,
            b_r: t.blue.r,
            b_g: t.blue.g,
            b_b: t.blue.b,
            b_l: t.blue.reference,
        }
    }
}

impl From<JoinedRecord> for JoinedTriplet {
    fn from(r: JoinedRecord) -> Self {
        JoinedTriplet {
            current: r.current,
            red: Reading::new(r.r_r, r.r_g, r.r_b, r.r_l),
            green: Reading::new(r.g_r, r.g_g, r.g_b, r.g_l),
            blue: Reading::new(r.b_r, r.b_g, r.b_b, r.b_l),
        }
    }
}

/// One brightness step of the solved table
/// (`Percent,d_R,d_G,d_B,dim_R,dim_G,dim_B,c_R,c_G,c_B`).
///
/// Only the drive and dim columns are needed to emit C sources; the others
/// default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverRecord {
    #[serde(
        rename(serialize = "Percent", deserialize = "percent"),
        default,
        deserialize_with = "byte_from_number"
    )]
    pub percent: u8,
    #[serde(
        rename(serialize = "d_R", deserialize = "d_r"),
        deserialize_with = "byte_from_number"
    )]
    pub d_r: u8,
    #[serde(
        rename(serialize = "d_G", deserialize = "d_g"),
        deserialize_with = "byte_from_number"
    )]
    pub d_g: u8,
    #[serde(
        rename(serialize = "d_B", deserialize = "d_b"),
        deserialize_with = "byte_from_number"
    )]
    pub d_b: u8,
    #[serde(
        rename(serialize = "dim_R", deserialize = "dim_r"),
        deserialize_with = "byte_from_number"
    )]
    pub dim_r: u8,
    #[serde(
        rename(serialize = "dim_G", deserialize = "dim_g"),
        deserialize_with = "byte_from_number"
    )]
    pub dim_g: u8,
    #[serde(
        rename(serialize = "dim_B", deserialize = "dim_b"),
        deserialize_with = "byte_from_number"
    )]
    pub dim_b: u8,
    #[serde(rename(serialize = "c_R", deserialize = "c_r"), default)]
    pub c_r: f64,
    #[serde(rename(serialize = "c_G", deserialize = "c_g"), default)]
    pub c_g: f64,
    #[serde(rename(serialize = "c_B", deserialize = "c_b"), default)]
    pub c_b: f64,
}

impl TableRecord for SolverRecord {
    const NAME: &'static str = "solver";
    const HEADER: &'static [&'static str] = &[
        "Percent", "d_R", "d_G", "d_B", "dim_R", "dim_G", "dim_B", "c_R", "c_G", "c_B",
    ];
    const REQUIRED: &'static [&'static str] = &["d_R", "d_G", "d_B", "dim_R", "dim_G", "dim_B"];
}

impl From<&LutRow> for SolverRecord {
    fn from(row: &LutRow) -> Self {
        Self {
            percent: row.percent,
            d_r: row.drive.r,
            d_g: row.drive.g,
            d_b: row.drive.b,
            dim_r: row.pwm.r,
            dim_g: row.pwm.g,
            dim_b: row.pwm.b,
            c_r: row.exact_current.r,
            c_g: row.exact_current.g,
            c_b: row.exact_current.b,
        }
    }
}

impl SolverRecord {
    pub fn drive(&self) -> Rgb<u8> {
        Rgb::new(self.d_r, self.d_g, self.d_b)
    }

    pub fn dim(&self) -> Rgb<u8> {
        Rgb::new(self.dim_r, self.dim_g, self.dim_b)
    }
}

/// Split solver rows into per-LED drive and dim columns.
pub fn solver_columns(records: &[SolverRecord]) -> (Rgb<Vec<u8>>, Rgb<Vec<u8>>) {
    let drive = Rgb::from_fn(|led| records.iter().map(|r| r.drive()[led]).collect());
    let dim = Rgb::from_fn(|led| records.iter().map(|r| r.dim()[led]).collect());
    (drive, dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use led_lut::Led;
    use serde::de::IntoDeserializer;

    #[test]
    fn test_synced_record_round_trip_through_row() {
        let row = SyncedRow::single("00:01.5", Led::Green, 7, Reading::new(1.0, 2.0, 3.0, 4.0));
        let record = SyncedRecord::from(&row);
        assert_eq!(record.current_r, 0);
        assert_eq!(record.current_g, 7);
        assert_eq!(record.luminosity, 4.0);
        assert_eq!(SyncedRow::from(record), row);
    }

    #[test]
    fn test_sample_record_nan_is_missing() {
        let record = SampleRecord {
            timestamp: "t".to_string(),
            r: Some(f64::NAN),
            g: Some(1.0),
            b: None,
            luminosity: Some(2.0),
        };
        let sample = RawSample::from(record);
        assert_eq!(sample.r, None);
        assert_eq!(sample.g, Some(1.0));
        assert_eq!(sample.b, None);
        assert_eq!(sample.reference, Some(2.0));
    }

    #[test]
    fn test_joined_record_maps_leds_and_channels() {
        let triplet = JoinedTriplet {
            current: 3,
            red: Reading::new(1.0, 2.0, 3.0, 4.0),
            green: Reading::new(5.0, 6.0, 7.0, 8.0),
            blue: Reading::new(9.0, 10.0, 11.0, 12.0),
        };
        let record = JoinedRecord::from(&triplet);
        assert_eq!(record.r_l, 4.0);
        assert_eq!(record.g_r, 5.0);
        assert_eq!(record.b_b, 11.0);
        assert_eq!(JoinedTriplet::from(record), triplet);
    }

    #[test]
    fn test_solver_columns() {
        let rows = [
            SolverRecord::from(&LutRow::OFF),
            SolverRecord::from(&LutRow {
                percent: 100,
                drive: Rgb::new(10, 20, 30),
                pwm: Rgb::new(200, 210, 255),
                exact_current: Rgb::new(9.5, 19.25, 30.0),
            }),
        ];
        let (drive, dim) = solver_columns(&rows);
        assert_eq!(drive.g, vec![0, 20]);
        assert_eq!(dim.r, vec![0, 200]);
        assert_eq!(dim[Led::Blue], vec![0, 255]);
    }

    fn current(value: f64) -> Result<u32, serde::de::value::Error> {
        current_from_number(value.into_deserializer())
    }

    #[test]
    fn test_current_rounds_half_to_even() {
        assert_eq!(current(2.5).unwrap(), 2);
        assert_eq!(current(3.5).unwrap(), 4);
        assert_eq!(current(7.0).unwrap(), 7);
        assert_eq!(current(1.4).unwrap(), 1);
    }

    #[test]
    fn test_current_at_or_below_epsilon_is_off() {
        assert_eq!(current(0.0).unwrap(), 0);
        assert_eq!(current(1e-13).unwrap(), 0);
        assert_eq!(current(-3.0).unwrap(), 0);
        assert_eq!(current(f64::NAN).unwrap(), 0);
    }

    #[test]
    fn test_current_rounding_to_zero_is_rejected() {
        assert!(current(0.5).is_err());
        assert!(current(0.2).is_err());
        assert!(current(f64::INFINITY).is_err());
    }

    #[test]
    fn test_measurements_must_be_finite() {
        let finite = |v: f64| -> Result<f64, serde::de::value::Error> {
            finite_number(v.into_deserializer())
        };
        assert_eq!(finite(1.5).unwrap(), 1.5);
        assert!(finite(f64::NAN).is_err());
        assert!(finite(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_headers_match_field_count() {
        assert_eq!(SampleRecord::HEADER.len(), 5);
        assert_eq!(SyncedRecord::HEADER.len(), 8);
        assert_eq!(JoinedRecord::HEADER.len(), 13);
        assert_eq!(SolverRecord::HEADER.len(), 10);
    }
}
