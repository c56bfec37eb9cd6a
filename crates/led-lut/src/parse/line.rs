//! Hand-written grammar for a single sensor log line.
//!
//! ```text
//! line      := any* '[' timestamp ']' any* TAG ':' ws* fields any*
//! timestamp := (not ']')+
//! fields    := 'R=' value ',' ws* 'G=' value ',' ws* 'B=' value ',' ws* 'L=' value
//! value     := '-'? ( digit+ ( '.' digit+ )? | 'nan' )
//! ```
//!
//! Letters are matched case-insensitively. When several `[` or tag positions
//! exist, the first combination that yields a full field list wins.

/// A value token: `None` for `nan`.
type Value = Option<f64>;

/// Cursor over the remainder of a line.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// Consume `expected` (ASCII, case-insensitive) if it is next.
    fn eat(&mut self, expected: &str) -> bool {
        let n = expected.len();
        match self.rest.get(..n) {
            Some(head) if head.eq_ignore_ascii_case(expected) => {
                self.rest = &self.rest[n..];
                true
            }
            _ => false,
        }
    }

    fn digits(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        head
    }

    fn value(&mut self) -> Option<Value> {
        let start = self.rest;
        self.eat("-");

        if self.eat("nan") {
            return Some(None);
        }

        let int_part = self.digits();
        if int_part.is_empty() {
            self.rest = start;
            return None;
        }

        // A '.' only belongs to the number when digits follow it.
        let before_fraction = self.rest;
        if self.eat(".") && self.digits().is_empty() {
            self.rest = before_fraction;
        }

        let consumed = start.len() - self.rest.len();
        start[..consumed].parse::<f64>().ok().map(Some)
    }

    /// `NAME=value` followed by `, ws*` unless it is the last field.
    fn field(&mut self, name: &str, last: bool) -> Option<Value> {
        if !self.eat(name) || !self.eat("=") {
            return None;
        }
        let value = self.value()?;
        if !last {
            if !self.eat(",") {
                return None;
            }
            self.skip_whitespace();
        }
        Some(value)
    }
}

/// The four channel fields of a matched line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fields {
    pub r: Value,
    pub g: Value,
    pub b: Value,
    pub l: Value,
}

/// Parse the field list that follows the tag and its colon.
pub(crate) fn parse_fields(text: &str) -> Option<Fields> {
    let mut cursor = Cursor::new(text);
    cursor.skip_whitespace();
    let r = cursor.field("R", false)?;
    let g = cursor.field("G", false)?;
    let b = cursor.field("B", false)?;
    let l = cursor.field("L", true)?;
    Some(Fields { r, g, b, l })
}

/// Byte offsets just past every case-insensitive occurrence of `needle`.
fn occurrences_after(haystack: &str, needle: &str) -> Vec<usize> {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    lower
        .match_indices(needle.as_str())
        .map(|(i, m)| i + m.len())
        .collect()
}

/// Locate the timestamp and field list in `line`.
///
/// `marker` is the tag followed by its colon, e.g. `OPT4060:`.
pub(crate) fn parse_line<'l>(line: &'l str, marker: &str) -> Option<(&'l str, Fields)> {
    for (open, _) in line.match_indices('[') {
        let after_open = &line[open + 1..];
        let Some(close) = after_open.find(']') else {
            // No later '[' can have a closing bracket either.
            return None;
        };
        if close == 0 {
            continue;
        }
        let timestamp = &after_open[..close];
        let tail = &after_open[close + 1..];

        for start in occurrences_after(tail, marker) {
            if let Some(fields) = parse_fields(&tail[start..]) {
                return Some((timestamp, fields));
            }
        }
    }
    None
}
