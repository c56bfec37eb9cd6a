//! Sensor log parsing.
//!
//! Turns lines such as
//!
//! ```text
//! [00:01:33.855,560] sensors: [main/0x20007568/0] OPT4060: R=384.000000, G=1184.000000, B=62.400002, L=5.727600
//! ```
//!
//! into [`RawSample`] values. Lines without the expected shape are skipped;
//! `nan` readings are kept as missing channels so later stages can tell
//! "no data" apart from "dark".

mod line;

use crate::model::RawSample;

/// Sensor tag printed in front of the channel fields by the capture firmware.
pub const DEFAULT_TAG: &str = "OPT4060";

/// Outcome of parsing one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineMatch {
    /// The line carried a timestamp and all four channel fields.
    Sample(RawSample),
    /// The line is not a sensor reading.
    NoMatch,
}

impl LineMatch {
    pub fn into_sample(self) -> Option<RawSample> {
        match self {
            LineMatch::Sample(sample) => Some(sample),
            LineMatch::NoMatch => None,
        }
    }
}

/// Parser for sensor log lines carrying a fixed tag.
///
/// # Example
///
/// ```
/// use led_lut::{LineMatch, LogParser};
///
/// let parser = LogParser::default();
/// let line = "[00:01:34.355,712] sensors: OPT4060: R=nan, G=1192.000000, B=67.599998, L=5.719000";
///
/// let LineMatch::Sample(sample) = parser.parse_line(line) else {
///     panic!("expected a sample");
/// };
/// assert_eq!(sample.timestamp, "00:01:34.355712");
/// assert_eq!(sample.r, None);
/// assert_eq!(sample.g, Some(1192.0));
/// ```
#[derive(Debug, Clone)]
pub struct LogParser {
    marker: String,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new(DEFAULT_TAG)
    }
}

impl LogParser {
    /// Create a parser for lines tagged `tag` (matched case-insensitively).
    pub fn new(tag: &str) -> Self {
        Self {
            marker: format!("{tag}:"),
        }
    }

    /// Parse one line.
    pub fn parse_line(&self, text: &str) -> LineMatch {
        match line::parse_line(text, &self.marker) {
            Some((timestamp, fields)) => LineMatch::Sample(RawSample {
                timestamp: normalize_timestamp(timestamp),
                r: fields.r,
                g: fields.g,
                b: fields.b,
                reference: fields.l,
            }),
            None => LineMatch::NoMatch,
        }
    }

    /// Lazily parse a sequence of lines, yielding only matched samples.
    pub fn samples<'p, I>(&'p self, lines: I) -> impl Iterator<Item = RawSample> + 'p
    where
        I: IntoIterator,
        I::IntoIter: 'p,
        I::Item: AsRef<str>,
    {
        lines
            .into_iter()
            .filter_map(move |line| self.parse_line(line.as_ref()).into_sample())
    }
}

/// Drop the thousands separator the logger puts in front of the microseconds
/// (`00:01:33.855,560` becomes `00:01:33.855560`).
pub fn normalize_timestamp(raw: &str) -> String {
    raw.replace(',', "")
}
