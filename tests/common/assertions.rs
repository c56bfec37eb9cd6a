//! Assertion helpers for tests.

use std::path::Path;

use pretty_assertions::assert_eq;

/// Values of C array `name` in an emitted source.
pub fn c_array(source: &str, name: &str) -> Vec<u8> {
    let start = source
        .find(&format!("{name} "))
        .or_else(|| source.find(&format!("{name}[")))
        .unwrap_or_else(|| panic!("array {name} not found in source"));
    let body = &source[start..];
    let open = body.find("= {").expect("array initializer") + 3;
    let close = body[open..].find("};").expect("array terminator") + open;

    body[open..close]
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse().unwrap_or_else(|_| panic!("bad value {v:?}")))
        .collect()
}

/// Assert the first line of a CSV file.
pub fn assert_csv_header(path: &Path, expected: &str) {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    assert_eq!(text.lines().next(), Some(expected), "header of {}", path.display());
}

/// Assert two files are byte-identical.
pub fn assert_same_bytes(a: &Path, b: &Path) {
    let left = std::fs::read(a).expect("read left file");
    let right = std::fs::read(b).expect("read right file");
    assert!(
        left == right,
        "{} and {} differ",
        a.display(),
        b.display()
    );
}
