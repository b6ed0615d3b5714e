//! Tabular decoder — raw delimited bytes → `Table`.
//!
//! Parsing is deliberately forgiving: the delimiter is sniffed from the
//! first lines, non-UTF-8 input falls back to Windows-1252 (common for
//! Excel-exported CSVs), and ragged rows are aligned to the header width.
//!
//! The one fixed transform is header promotion: the first line of the
//! input is discarded and the second line becomes the column names. Every
//! ingestion path (upload, URL fetch, warm load) goes through `decode`.

use serde::Serialize;

/// An immutable, rectangular table: named columns + aligned rows.
///
/// Invariants held by construction:
/// - every row has exactly `columns.len()` cells
/// - column names are non-empty and unique after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Render the table back to comma-delimited text (header + rows).
    ///
    /// Used to hand the bound dataset to the reasoning engine as context.
    pub fn to_csv_text(&self) -> String {
        // Writer only fails on I/O and the sink is a Vec, so the error
        // arms below are effectively unreachable.
        let mut writer = csv::Writer::from_writer(Vec::new());
        if writer.write_record(&self.columns).is_err() {
            return String::new();
        }
        for row in &self.rows {
            if writer.write_record(row).is_err() {
                return String::new();
            }
        }
        match writer.into_inner() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

/// Decoding failures. The ingest pipeline collapses all of these into a
/// single coarse `DecodeFailed`; the variants exist for log detail.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Input contains no delimited rows")]
    Empty,
    #[error("Delimited text could not be parsed: {0}")]
    Malformed(String),
    #[error("Promoted header has no columns")]
    NoColumns,
}

/// Decode raw bytes into a `Table`, applying header promotion.
///
/// The input is first parsed with its initial line treated as a throwaway
/// header. That line is discarded, the next line becomes the real column
/// names, and the remaining lines become the data rows. A single-line
/// input yields a zero-row table whose header is that line.
pub fn decode(raw: &[u8]) -> Result<Table, DecodeError> {
    let content = bytes_to_utf8(raw);
    if content.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let delimiter = sniff_delimiter(&content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        records.push(record.iter().map(str::to_string).collect());
    }

    if records.is_empty() {
        return Err(DecodeError::Empty);
    }

    // Header promotion: line 1 is a throwaway header, line 2 holds the
    // real column names, data starts at line 3. A lone line promotes
    // itself and leaves no data rows.
    let (header, data) = if records.len() == 1 {
        let header = records.swap_remove(0);
        (header, Vec::new())
    } else {
        let mut iter = records.into_iter();
        let _default_header = iter.next();
        let header = match iter.next() {
            Some(h) => h,
            None => return Err(DecodeError::Empty),
        };
        (header, iter.collect())
    };

    let columns = normalize_columns(header);
    if columns.is_empty() {
        return Err(DecodeError::NoColumns);
    }

    let width = columns.len();
    let rows = data
        .into_iter()
        .map(|mut row| {
            row.resize(width, String::new());
            row
        })
        .collect();

    Ok(Table { columns, rows })
}

/// Convert raw bytes to UTF-8, falling back to Windows-1252 for bytes
/// that are not valid UTF-8.
fn bytes_to_utf8(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(raw);
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across
/// the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per
/// line; the delimiter producing the most consistent count (>1 field)
/// wins. Falls back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Normalize promoted column names: trim whitespace, name blank columns
/// `column_{n}`, and deduplicate repeats with a `.{n}` suffix.
fn normalize_columns(header: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut columns = Vec::with_capacity(header.len());

    for (idx, raw) in header.into_iter().enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };

        let count = seen.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base
        } else {
            format!("{base}.{count}")
        };
        *count += 1;
        columns.push(name);
    }

    columns
}
