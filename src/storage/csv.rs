//! Price list CSV import
//!
//! Converts the spreadsheet export of the price list into the JSON array read
//! by [`crate::storage::tables::DataTables`]. Each row becomes an object keyed
//! by the header names; empty cells are left out.

use std::fs;
use std::io::Read;
use std::path::Path;

use ::csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};

use crate::storage::StorageError;

pub const DEFAULT_DELIMITER: u8 = b';';

/// Parse CSV rows into JSON objects
pub fn rows_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Value>, StorageError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = Map::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            if header.is_empty() || cell.is_empty() {
                continue;
            }
            row.insert(header.clone(), Value::String(cell.to_string()));
        }
        if !row.is_empty() {
            rows.push(Value::Object(row));
        }
    }
    Ok(rows)
}

/// Convert `input` to a pretty-printed JSON array at `output`, returning the row count
pub fn convert_price_list(
    input: &Path,
    output: &Path,
    delimiter: u8,
) -> Result<usize, StorageError> {
    let file = fs::File::open(input)?;
    let rows = rows_from_reader(file, delimiter)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output, serde_json::to_string_pretty(&rows)?)?;

    tracing::info!(
        "Converted {} -> {} ({} rows)",
        input.display(),
        output.display(),
        rows.len()
    );
    Ok(rows.len())
}
