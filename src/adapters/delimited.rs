//! CSV/TSV adapter.
//!
//! The first record is the header row. Every other cell goes through
//! [`Value::infer_from_text`], so a column may come back with mixed kinds.

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::types::{Table, Value};
use crate::uri::Location;

use super::{read_source_text, write_destination};

/// Delimited text (`csv`, `tsv`).
///
/// `?delimiter=` overrides the scheme's default single-byte delimiter.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedAdapter;

impl Adapter for DelimitedAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["csv", "tsv"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn is_text_based(&self) -> bool {
        true
    }

    fn example_url(&self, scheme: &str) -> String {
        format!("{scheme}:///path/to/file.{scheme}")
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let delimiter = delimiter_for(location)?;
        let text = read_source_text(location, stdio)?;
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        read_delimited(&mut rdr).map(Loaded::table)
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let delimiter = delimiter_for(location)?;
        let bytes = write_delimited(table, delimiter)?;
        write_destination(location, stdio, &bytes)
    }
}

/// Read a header row and inferred data rows from an existing CSV reader.
///
/// Short records are padded with nulls. A record longer than the header is malformed.
pub fn read_delimited<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> AdapterResult<Table> {
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let width = headers.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based for users, +1 again for the header row.
        let user_row = row_idx0 + 2;
        let record = result?;
        if record.len() > width {
            return Err(AdapterError::Malformed {
                message: format!("row {user_row} has {} fields, header has {width}", record.len()),
            });
        }
        rows.push(record.iter().map(Value::infer_from_text).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Render `table` as delimited text: header row first, every record terminated by `\n`.
pub fn write_delimited(table: &Table, delimiter: u8) -> AdapterResult<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(Value::to_text))?;
    }
    wtr.into_inner().map_err(|e| AdapterError::Io(e.into_error()))
}

fn delimiter_for(location: &Location) -> AdapterResult<u8> {
    if let Some(raw) = location.param("delimiter") {
        let raw = if raw == "\\t" { "\t" } else { raw };
        return match raw.as_bytes() {
            [b] => Ok(*b),
            _ => Err(AdapterError::InvalidParams {
                message: format!("delimiter must be a single byte, got '{raw}'"),
            }),
        };
    }
    Ok(if location.scheme() == "tsv" { b'\t' } else { b',' })
}
