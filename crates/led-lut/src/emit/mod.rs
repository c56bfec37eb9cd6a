//! C header and source generation for firmware.
//!
//! The table is rendered as six `uint8_t` arrays indexed by brightness step:
//! drive current and PWM dim value per LED. The header declares them together
//! with `LED_CALIBRATION_BRIGHTNESS_STEPS`; the source defines them.
//!
//! Output depends only on the values and the file stem, so regenerating from
//! the same table is byte-identical.

use std::fmt::{self, Write as _};

use crate::model::{Led, Rgb};
use crate::solve::CalibrationTable;

/// Values per line in array initializers unless configured otherwise.
pub const DEFAULT_VALUES_PER_LINE: usize = 16;

const GENERATED_NOTICE: &str = "/* Auto-generated from CSV; do not edit by hand. */";

/// Errors of the emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// The six columns do not all have the same length.
    LengthMismatch {
        /// Drive current lengths (R, G, B)
        current: [usize; 3],
        /// PWM lengths (R, G, B)
        pwm: [usize; 3],
    },
    /// `values_per_line` was zero.
    ZeroValuesPerLine,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::LengthMismatch { current, pwm } => write!(
                f,
                "all arrays must have the same length (current {:?}, pwm {:?})",
                current, pwm
            ),
            EmitError::ZeroValuesPerLine => write!(f, "values per line must be at least 1"),
        }
    }
}

impl std::error::Error for EmitError {}

/// The six arrays to emit, all of the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutArrays {
    current: Rgb<Vec<u8>>,
    pwm: Rgb<Vec<u8>>,
}

impl LutArrays {
    /// Arrays taken from a solved table, one entry per row.
    pub fn from_table(table: &CalibrationTable) -> Self {
        let rows = table.rows();
        Self {
            current: Rgb::from_fn(|led| rows.iter().map(|row| row.drive[led]).collect()),
            pwm: Rgb::from_fn(|led| rows.iter().map(|row| row.pwm[led]).collect()),
        }
    }

    /// Arrays from separately loaded columns.
    pub fn from_columns(current: Rgb<Vec<u8>>, pwm: Rgb<Vec<u8>>) -> Result<Self, EmitError> {
        let current_lens = [current.r.len(), current.g.len(), current.b.len()];
        let pwm_lens = [pwm.r.len(), pwm.g.len(), pwm.b.len()];
        let first = current_lens[0];
        if current_lens.iter().chain(&pwm_lens).any(|&len| len != first) {
            return Err(EmitError::LengthMismatch {
                current: current_lens,
                pwm: pwm_lens,
            });
        }
        Ok(Self { current, pwm })
    }

    /// Number of brightness steps.
    pub fn steps(&self) -> usize {
        self.current.r.len()
    }

    pub fn current(&self, led: Led) -> &[u8] {
        &self.current[led]
    }

    pub fn pwm(&self, led: Led) -> &[u8] {
        &self.pwm[led]
    }
}

/// Rendered header and source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSources {
    pub header: String,
    pub source: String,
}

/// Header guard base for a file stem: non-identifier characters become `_`,
/// a leading `_` is added if the stem does not start with a letter or `_`,
/// and the result is upper-cased.
///
/// ```
/// use led_lut::emit::sanitize_macro_base;
///
/// assert_eq!(sanitize_macro_base("led-cal.v2"), "LED_CAL_V2");
/// assert_eq!(sanitize_macro_base("2024_lut"), "_2024_LUT");
/// ```
pub fn sanitize_macro_base(stem: &str) -> String {
    let mut s: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !s.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        s.insert(0, '_');
    }
    s.to_ascii_uppercase()
}

/// Array name for one LED, padded so declarations line up.
fn array_name(kind: &str, led: Led) -> String {
    let name = format!("g_led_calibration_brightness_to_{}_{}", kind, led.name());
    format!("{:<45}", name)
}

fn chunk_lines(values: &[u8], per_line: usize) -> String {
    values
        .chunks(per_line)
        .map(|chunk| {
            chunk
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Render the header declaring the arrays.
pub fn render_header(macro_base: &str, steps: usize) -> String {
    let guard = format!("{}_H", macro_base);
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "{GENERATED_NOTICE}
#ifndef {guard}
#define {guard}

#include <stdint.h>

#ifdef __cplusplus
extern \"C\" {{
#endif

#define LED_CALIBRATION_BRIGHTNESS_STEPS ({steps}u)

/* Brightness → current (LP5810 0..255) */
"
    );
    for led in Led::ALL {
        let _ = writeln!(
            out,
            "extern const uint8_t {}[LED_CALIBRATION_BRIGHTNESS_STEPS];",
            array_name("current", led)
        );
    }
    out.push_str("\n/* Brightness → PWM dim (0..255) */\n");
    for led in Led::ALL {
        let _ = writeln!(
            out,
            "extern const uint8_t {}[LED_CALIBRATION_BRIGHTNESS_STEPS];",
            array_name("pwm", led)
        );
    }
    let _ = write!(
        out,
        "
#ifdef __cplusplus
}} /* extern \"C\" */
#endif

#endif /* {guard} */
"
    );
    out
}

/// Render the source defining the arrays.
pub fn render_source(
    header_file: &str,
    arrays: &LutArrays,
    values_per_line: usize,
) -> Result<String, EmitError> {
    if values_per_line == 0 {
        return Err(EmitError::ZeroValuesPerLine);
    }

    let mut out = format!("{GENERATED_NOTICE}\n#include \"{header_file}\"\n");
    let columns = Led::ALL
        .into_iter()
        .map(|led| ("current", led, arrays.current(led)))
        .chain(Led::ALL.into_iter().map(|led| ("pwm", led, arrays.pwm(led))));
    for (kind, led, values) in columns {
        let _ = write!(
            out,
            "\nconst uint8_t {}[LED_CALIBRATION_BRIGHTNESS_STEPS] = {{\n{}\n}};\n",
            array_name(kind, led),
            chunk_lines(values, values_per_line)
        );
    }
    Ok(out)
}

/// Render both files for output stem `stem` (file name without extension).
///
/// # Example
///
/// ```
/// use led_lut::emit::{emit_c_sources, LutArrays};
/// use led_lut::Rgb;
///
/// let col = || vec![0u8, 5, 9];
/// let arrays = LutArrays::from_columns(
///     Rgb::new(col(), col(), col()),
///     Rgb::new(col(), col(), col()),
/// ).unwrap();
///
/// let files = emit_c_sources(&arrays, "led_cal", 16).unwrap();
/// assert!(files.header.contains("#define LED_CALIBRATION_BRIGHTNESS_STEPS (3u)"));
/// assert!(files.source.contains("#include \"led_cal.h\""));
/// assert!(files.source.contains("{\n0, 5, 9\n};"));
/// ```
pub fn emit_c_sources(
    arrays: &LutArrays,
    stem: &str,
    values_per_line: usize,
) -> Result<CSources, EmitError> {
    let source = render_source(&format!("{stem}.h"), arrays, values_per_line)?;
    Ok(CSources {
        header: render_header(&sanitize_macro_base(stem), arrays.steps()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solve::{LutRow, PwmMode};

    fn arrays(n: usize) -> LutArrays {
        let col = |offset: usize| (0..n).map(|i| (i + offset) as u8).collect::<Vec<u8>>();
        LutArrays::from_columns(
            Rgb::new(col(0), col(1), col(2)),
            Rgb::new(col(100), col(101), col(102)),
        )
        .unwrap()
    }

    #[test]
    fn test_sanitize_macro_base() {
        assert_eq!(sanitize_macro_base("led_cal"), "LED_CAL");
        assert_eq!(sanitize_macro_base("_x"), "_X");
        assert_eq!(sanitize_macro_base("9lives"), "_9LIVES");
        assert_eq!(sanitize_macro_base("a b"), "A_B");
        assert_eq!(sanitize_macro_base(""), "_");
    }

    #[test]
    fn test_header_layout() {
        let header = render_header("LED_CAL", 101);
        assert!(header.starts_with(GENERATED_NOTICE));
        assert!(header.contains("#ifndef LED_CAL_H\n#define LED_CAL_H\n"));
        assert!(header.contains("#define LED_CALIBRATION_BRIGHTNESS_STEPS (101u)"));
        assert!(header.contains(
            "extern const uint8_t g_led_calibration_brightness_to_current_red  [LED_CALIBRATION_BRIGHTNESS_STEPS];"
        ));
        assert!(header.contains(
            "extern const uint8_t g_led_calibration_brightness_to_pwm_green    [LED_CALIBRATION_BRIGHTNESS_STEPS];"
        ));
        assert!(header.ends_with("#endif /* LED_CAL_H */\n"));
        assert_eq!(header.matches("extern const uint8_t").count(), 6);
    }

    #[test]
    fn test_source_wraps_values() {
        let source = render_source("x.h", &arrays(20), 16).unwrap();
        let expected_red = "const uint8_t g_led_calibration_brightness_to_current_red  [LED_CALIBRATION_BRIGHTNESS_STEPS] = {\n\
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,\n\
            16, 17, 18, 19\n};\n";
        assert!(source.contains(expected_red), "{source}");
        assert!(source.contains("= {\n102, 103,"));
        assert_eq!(source.matches("const uint8_t").count(), 6);
    }

    #[test]
    fn test_zero_values_per_line_rejected() {
        assert_eq!(
            render_source("x.h", &arrays(2), 0),
            Err(EmitError::ZeroValuesPerLine)
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = LutArrays::from_columns(
            Rgb::new(vec![1], vec![1], vec![1]),
            Rgb::new(vec![1], vec![1, 2], vec![1]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EmitError::LengthMismatch {
                current: [1, 1, 1],
                pwm: [1, 2, 1]
            }
        );
    }

    #[test]
    fn test_from_table_copies_fields() {
        let row = LutRow {
            percent: 100,
            drive: Rgb::new(1, 2, 3),
            pwm: Rgb::new(4, 5, 6),
            exact_current: Rgb::default(),
        };
        let table = CalibrationTable::new(vec![LutRow::OFF, row], 10.0, PwmMode::Luminance);
        let arrays = LutArrays::from_table(&table);
        assert_eq!(arrays.steps(), 2);
        assert_eq!(arrays.current(Led::Blue), &[0, 3]);
        assert_eq!(arrays.pwm(Led::Red), &[0, 4]);
    }

    #[test]
    fn test_arrays_compare_by_value() {
        fn assert_eq_type<T: Eq>(_: &T) {}

        let table = CalibrationTable::new(vec![LutRow::OFF], 1.0, PwmMode::Luminance);
        let from_table = LutArrays::from_table(&table);
        assert_eq_type(&from_table);

        let zeros = || Rgb::new(vec![0u8], vec![0], vec![0]);
        assert_eq!(from_table, LutArrays::from_columns(zeros(), zeros()).unwrap());
        assert_ne!(arrays(3), arrays(4));
    }

    #[test]
    fn test_emit_is_deterministic() {
        let a = emit_c_sources(&arrays(7), "led_cal", 4).unwrap();
        let b = emit_c_sources(&arrays(7), "led_cal", 4).unwrap();
        assert_eq!(a, b);
    }
}
