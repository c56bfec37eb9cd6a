//! CSV reading and writing for the stage intermediates.
//!
//! A path of `-` means stdin when reading and stdout when writing.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::TableError;
use crate::models::TableRecord;

/// Rows read from a table, plus the number of rows that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRead<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn open_input(path: &Path) -> Result<Box<dyn Read>, TableError> {
    if is_stdio(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(file))
}

/// Create `path` (and its parent directory), or lock stdout for `-`.
pub fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if is_stdio(path) {
        return Ok(Box::new(io::stdout().lock()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Box::new(File::create(path)?))
}

/// Read every decodable row of `path`.
///
/// Headers are matched case-insensitively and may appear in any order.
/// Rows that fail to decode are skipped with a warning and counted.
pub fn read_table<T: TableRecord>(path: &Path) -> Result<TableRead<T>, TableError> {
    let input = open_input(path)?;
    read_table_from(input, path)
}

/// Read rows from any reader; `path` only labels diagnostics.
pub fn read_table_from<T: TableRecord, R: Read>(
    input: R,
    path: &Path,
) -> Result<TableRead<T>, TableError> {
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let found: Vec<String> = reader.headers().map_err(csv_error)?.iter().map(String::from).collect();
    let normalized: StringRecord = found.iter().map(|h| h.trim().to_lowercase()).collect();

    let missing: Vec<String> = T::REQUIRED
        .iter()
        .filter(|column| !normalized.iter().any(|h| h == column.to_lowercase()))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TableError::MissingColumns {
            path: path.to_path_buf(),
            missing,
            found,
        });
    }

    let mut records = Vec::new();
    let mut malformed = 0;
    for (index, row) in reader.records().enumerate() {
        let decoded = row.and_then(|row| row.deserialize::<T>(Some(&normalized)));
        match decoded {
            Ok(record) => records.push(record),
            Err(e) => {
                malformed += 1;
                // Line 1 is the header.
                tracing::warn!(
                    table = T::NAME,
                    path = %path.display(),
                    line = index + 2,
                    error = %e,
                    "Skipping malformed row"
                );
            }
        }
    }

    tracing::debug!(
        table = T::NAME,
        path = %path.display(),
        rows = records.len(),
        malformed,
        "Read table"
    );
    Ok(TableRead { records, malformed })
}

/// Write `records` to `path` with the canonical header, which is written even
/// for an empty table.
pub fn write_table<'a, T, I>(path: &Path, records: I) -> Result<usize, TableError>
where
    T: TableRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let io_error = |source| TableError::Io {
        path: PathBuf::from(path),
        source,
    };
    let output = open_output(path).map_err(io_error)?;
    let count = write_table_to(output, path, records)?;
    tracing::debug!(table = T::NAME, path = %path.display(), rows = count, "Wrote table");
    Ok(count)
}

/// Write rows to any writer; `path` only labels diagnostics.
pub fn write_table_to<'a, T, I, W>(output: W, path: &Path, records: I) -> Result<usize, TableError>
where
    T: TableRecord + 'a,
    I: IntoIterator<Item = &'a T>,
    W: Write,
{
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    writer.write_record(T::HEADER).map_err(csv_error)?;

    let mut count = 0;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
        count += 1;
    }
    writer.flush().map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(count)
}
