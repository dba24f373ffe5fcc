//! Built-in format adapters.
//!
//! File-based adapters share one convention: a location whose path is `-` reads from the
//! [`Stdio`] input instead of a file, or writes to the [`Stdio`] output.
//!
//! - [`delimited`]: `csv`, `tsv`
//! - [`json`]: `json`, `jsonl`/`ndjson`
//! - [`array`]: `list`, `csa`, `jsonarray`, `pylist`
//! - [`ascii`]: ASCII/Markdown renderers (write-only)
//! - [`parquet`]: `parquet`
//! - [`excel`]: `xls` (feature `excel`)
//! - [`sqlite`]: `sqlite`, `sqlite3`
//! - [`xml`]: `xml` (read-only, always asks for pre-processing)

pub mod array;
pub mod ascii;
pub mod delimited;
pub mod excel;
pub mod json;
pub mod parquet;
pub mod sqlite;
pub mod xml;

use std::fs;
use std::io;

use crate::error::{AdapterError, AdapterResult, ConvertResult};
use crate::registry::{RegistryBuilder, Stdio};
use crate::types::Table;
use crate::uri::{Location, STDIO_PATH};

/// Register every built-in adapter.
pub fn register_defaults(builder: RegistryBuilder) -> ConvertResult<RegistryBuilder> {
    builder
        .register(delimited::DelimitedAdapter)?
        .register(json::JsonAdapter)?
        .register(array::ListAdapter)?
        .register(array::CsaAdapter)?
        .register(array::JsonArrayAdapter)?
        .register(array::PyListAdapter)?
        .register(ascii::AsciiAdapter)?
        .register(parquet::ParquetAdapter)?
        .register(excel::ExcelAdapter)?
        .register(sqlite::SqliteAdapter)?
        .register(xml::XmlAdapter)
}

/// Read the whole source as bytes, from stdin for `-`.
pub(crate) fn read_source_bytes(location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<Vec<u8>> {
    let mut buf = Vec::new();
    if location.is_stdio() {
        stdio.input().read_to_end(&mut buf)?;
    } else {
        let path = location.file_path();
        buf = fs::read(&path).map_err(|e| not_found_or_io(&path, e))?;
    }
    if buf.is_empty() {
        return Err(AdapterError::EmptySource {
            message: format!("{} has no data", describe_source(location)),
        });
    }
    Ok(buf)
}

/// Read the whole source as UTF-8 text. Whitespace-only input counts as empty.
pub(crate) fn read_source_text(location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
    let bytes = read_source_bytes(location, stdio)?;
    let text = String::from_utf8(bytes).map_err(|e| AdapterError::Malformed {
        message: format!("{} is not valid utf-8: {e}", describe_source(location)),
    })?;
    if text.trim().is_empty() {
        return Err(AdapterError::EmptySource {
            message: format!("{} has no data", describe_source(location)),
        });
    }
    Ok(text)
}

/// Write `bytes` to the destination, to stdout for `-`, and describe where they went.
pub(crate) fn write_destination(location: &Location, stdio: &mut Stdio<'_>, bytes: &[u8]) -> AdapterResult<String> {
    if location.is_stdio() {
        let out = stdio.output();
        out.write_all(bytes)?;
        out.flush()?;
        return Ok(STDIO_PATH.to_string());
    }
    let path = location.file_path();
    fs::write(&path, bytes).map_err(|e| not_found_or_io(&path, e))?;
    Ok(path)
}

/// Require a single-column table for array formats.
pub(crate) fn require_array<'t>(table: &'t Table, scheme: &str) -> AdapterResult<Vec<&'t crate::types::Value>> {
    table.as_array().ok_or_else(|| AdapterError::InvalidParams {
        message: format!(
            "'{scheme}' holds a single column of values, but the table has {} columns ({})",
            table.columns.len(),
            table.columns.join(", ")
        ),
    })
}

pub(crate) fn not_found_or_io(path: &str, e: io::Error) -> AdapterError {
    if e.kind() == io::ErrorKind::NotFound {
        AdapterError::NotFound {
            path: path.to_string(),
        }
    } else {
        AdapterError::Io(e)
    }
}

fn describe_source(location: &Location) -> String {
    if location.is_stdio() {
        "stdin".to_string()
    } else {
        location.file_path()
    }
}
