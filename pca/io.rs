//! # Assay Table Loading and Result Output
//!
//! Reads delimited text exports (CSV or TSV) into [`CompositionRow`]s and writes PCA
//! results back out as TSV tables and a TOML document.
//!
//! - Lenient cells: blank cells and the usual missing markers (`NA`, `NaN`, `null`, `-`)
//!   load as missing; text cells in a numeric column load as missing too.
//! - Detection-limit strings: a cell such as `<0.05` loads as `-0.05`, the conventional
//!   negative encoding for "below 0.05".
//! - Sample identifiers: taken from a `sample_id` column when present, otherwise
//!   sequential 1-based identifiers are generated.

use crate::types::{CompositionRow, FullPcaResult};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

pub const SAMPLE_ID_COLUMN: &str = "sample_id";

const MISSING_MARKERS: [&str; 6] = ["", "na", "nan", "null", "-", "n/a"];

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse delimited input: {0}")]
    CsvError(#[from] csv::Error),
    #[error("The input file has no header row.")]
    MissingHeader,
    #[error(
        "The requested column '{0}' was not found in the input file. \
         Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error("The input file contains no data rows.")]
    NoRows,
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write output file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to serialize results to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// A loaded assay table.
#[derive(Debug, Clone)]
pub struct AssayTable {
    /// Header names in file order, excluding the sample id column.
    pub headers: Vec<String>,
    pub rows: Vec<CompositionRow>,
    pub sample_ids: Vec<String>,
}

impl AssayTable {
    /// Headers with at least one parseable numeric value.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|h| self.rows.iter().any(|r| matches!(r.get(*h), Some(Some(_)))))
            .cloned()
            .collect()
    }

    /// Verifies that every requested column exists.
    pub fn require_columns(&self, columns: &[String]) -> Result<(), DataError> {
        match columns.iter().find(|c| !self.headers.contains(c)) {
            Some(missing) => Err(DataError::ColumnNotFound(missing.clone())),
            None => Ok(()),
        }
    }
}

/// Loads a CSV or TSV file. Files ending in `.tsv`, `.tab` or `.txt` are read as
/// tab-delimited; everything else as comma-delimited.
pub fn load_assay_table(path: &Path) -> Result<AssayTable, DataError> {
    let delimiter = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv" | "tab" | "txt") => b'\t',
        _ => b',',
    };
    let file = fs::File::open(path)?;
    let table = read_assay_table(file, delimiter)?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Reads an assay table from any reader with the given delimiter.
pub fn read_assay_table<R: std::io::Read>(
    reader: R,
    delimiter: u8,
) -> Result<AssayTable, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let all_headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    if all_headers.is_empty() || all_headers.iter().all(|h| h.is_empty()) {
        return Err(DataError::MissingHeader);
    }
    let id_index = all_headers.iter().position(|h| h == SAMPLE_ID_COLUMN);

    let mut rows = Vec::new();
    let mut sample_ids = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        let mut row = CompositionRow::with_capacity(all_headers.len());
        for (j, header) in all_headers.iter().enumerate() {
            if Some(j) == id_index {
                continue;
            }
            row.insert(header.clone(), record.get(j).and_then(parse_cell));
        }
        let id = id_index
            .and_then(|j| record.get(j))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| (i + 1).to_string());
        sample_ids.push(id);
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(DataError::NoRows);
    }

    let headers = all_headers
        .into_iter()
        .enumerate()
        .filter(|(j, _)| Some(*j) != id_index)
        .map(|(_, h)| h)
        .collect();

    Ok(AssayTable {
        headers,
        rows,
        sample_ids,
    })
}

/// Parses one cell. `<x` becomes `-x`; missing markers and text become `None`.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let cell = raw.trim();
    if MISSING_MARKERS.contains(&cell.to_ascii_lowercase().as_str()) {
        return None;
    }
    if let Some(limit) = cell.strip_prefix('<') {
        return limit
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| -v.abs());
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Writes the sample scores as `sample_id\tPC1\tPC2...`. `sample_ids` is indexed by the
/// original input row.
pub fn write_scores_tsv(
    path: &Path,
    result: &FullPcaResult,
    sample_ids: &[String],
) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    let mut buffer = ryu::Buffer::new();

    write!(writer, "{SAMPLE_ID_COLUMN}")?;
    for c in 0..result.n_components() {
        write!(writer, "\tPC{}", c + 1)?;
    }
    writeln!(writer)?;

    for (score_row, &input_row) in result.scores.rows().into_iter().zip(&result.row_indices) {
        let id = sample_ids
            .get(input_row)
            .cloned()
            .unwrap_or_else(|| (input_row + 1).to_string());
        write!(writer, "{id}")?;
        for value in score_row.iter() {
            write!(writer, "\t{}", buffer.format(*value))?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the loadings as `column\tPC1\tPC2...`.
pub fn write_loadings_tsv(path: &Path, result: &FullPcaResult) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    let mut buffer = ryu::Buffer::new();

    write!(writer, "column")?;
    for c in 0..result.n_components() {
        write!(writer, "\tPC{}", c + 1)?;
    }
    writeln!(writer)?;

    for (column, loadings) in result.columns.iter().zip(result.loadings.rows()) {
        write!(writer, "{column}")?;
        for value in loadings.iter() {
            write!(writer, "\t{}", buffer.format(*value))?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes any result document to a TOML file.
pub fn save_toml<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let toml_string = toml::to_string_pretty(value)?;
    let mut writer = BufWriter::new(fs::File::create(path)?);
    writer.write_all(toml_string.as_bytes())?;
    writer.flush()?;
    Ok(())
}
