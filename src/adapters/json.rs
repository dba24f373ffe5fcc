//! JSON record adapters.
//!
//! Supported inputs for `json`:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object: `{"a":1}` (one row)
//! - Newline-delimited JSON (NDJSON), as a fallback when the text is not one JSON value
//!
//! `jsonl`/`ndjson` always read and write one object per line.
//!
//! Columns are the union of object keys in first-seen order. Nested arrays and objects are
//! kept as compact JSON text.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::types::{Table, Value};
use crate::uri::Location;

use super::{read_source_text, write_destination};

/// JSON records (`json`, `jsonl`, `ndjson`).
///
/// `json` accepts `?indent=N` to pretty-print output.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonAdapter;

impl Adapter for JsonAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["json", "jsonl", "ndjson"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn example_url(&self, scheme: &str) -> String {
        format!("{scheme}:///path/to/file.{scheme}")
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let text = read_source_text(location, stdio)?;
        let table = if is_lines(location) {
            read_json_lines(&text)?
        } else {
            read_json(&text)?
        };
        Ok(Loaded::table(table))
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let bytes = if is_lines(location) {
            write_json_lines(table)?
        } else {
            write_json(table, indent_for(location)?)?
        };
        write_destination(location, stdio, &bytes)
    }
}

/// Parse a JSON array of objects, a single object, or NDJSON.
pub fn read_json(input: &str) -> AdapterResult<Table> {
    let trimmed = input.trim();

    // First try parsing as a single JSON value (array or object).
    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Array(items)) => records_to_table(&items),
        Ok(v @ JsonValue::Object(_)) => records_to_table(std::slice::from_ref(&v)),
        Ok(_) => Err(AdapterError::Malformed {
            message: "json must be an object, an array of objects, or NDJSON".to_string(),
        }),
        Err(_) => read_json_lines(trimmed),
    }
}

/// Parse newline-delimited JSON objects. Blank lines are skipped.
pub fn read_json_lines(input: &str) -> AdapterResult<Table> {
    let mut values = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<JsonValue>(line).map_err(|e| AdapterError::Malformed {
            message: format!("invalid ndjson at line {}: {}", i + 1, e),
        })?;
        values.push(v);
    }
    records_to_table(&values)
}

fn records_to_table(values: &[JsonValue]) -> AdapterResult<Table> {
    let mut columns: Vec<String> = Vec::new();
    let mut objects: Vec<&Map<String, JsonValue>> = Vec::with_capacity(values.len());

    for (idx0, v) in values.iter().enumerate() {
        let obj = v.as_object().ok_or_else(|| AdapterError::Malformed {
            message: format!("row {} is not a json object", idx0 + 1),
        })?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(Value::from_json).unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Ok(Table::new(columns, rows))
}

fn row_object(columns: &[String], row: &[Value]) -> JsonValue {
    let map: Map<String, JsonValue> = columns
        .iter()
        .zip(row)
        .map(|(c, v)| (c.clone(), v.to_json()))
        .collect();
    JsonValue::Object(map)
}

/// Render `table` as a JSON array of objects, keys in column order.
pub fn write_json(table: &Table, indent: Option<usize>) -> AdapterResult<Vec<u8>> {
    let records = JsonValue::Array(
        table
            .rows
            .iter()
            .map(|row| row_object(&table.columns, row))
            .collect(),
    );

    let mut out = match indent {
        None => serde_json::to_vec(&records)?,
        Some(n) => {
            let pad = vec![b' '; n];
            let mut buf = Vec::new();
            let fmt = serde_json::ser::PrettyFormatter::with_indent(&pad);
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
            records.serialize(&mut ser)?;
            buf
        }
    };
    out.push(b'\n');
    Ok(out)
}

/// Render `table` as one compact JSON object per line.
pub fn write_json_lines(table: &Table) -> AdapterResult<Vec<u8>> {
    let mut out = Vec::new();
    for row in &table.rows {
        serde_json::to_writer(&mut out, &row_object(&table.columns, row))?;
        out.push(b'\n');
    }
    Ok(out)
}

fn is_lines(location: &Location) -> bool {
    matches!(location.scheme(), "jsonl" | "ndjson")
}

fn indent_for(location: &Location) -> AdapterResult<Option<usize>> {
    location
        .param("indent")
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| AdapterError::InvalidParams {
                message: format!("indent must be a non-negative integer, got '{raw}'"),
            })
        })
        .transpose()
}
