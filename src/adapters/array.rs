//! Array formats: a flat list of scalars.
//!
//! Loading produces a single column named [`ARRAY_COLUMN`](crate::types::ARRAY_COLUMN);
//! dumping accepts any single-column table and rejects wider ones.

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::types::{Table, Value, format_float};
use crate::uri::Location;

use super::{read_source_text, require_array, write_destination};

/// One item per line (`list`). Written without a trailing newline.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListAdapter;

impl Adapter for ListAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["list"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn is_text_based(&self) -> bool {
        true
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let text = read_source_text(location, stdio)?;
        let body = text.strip_suffix('\n').unwrap_or(&text);
        let values = body
            .split('\n')
            .map(|line| Value::infer_from_text(line.strip_suffix('\r').unwrap_or(line)))
            .collect();
        Ok(Loaded::table(Table::from_array(values)))
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let values = require_array(table, location.scheme())?;
        let text = join_text(&values, "\n");
        write_destination(location, stdio, text.as_bytes())
    }
}

/// Comma-separated atoms on one line (`csa`).
#[derive(Debug, Default, Clone, Copy)]
pub struct CsaAdapter;

impl Adapter for CsaAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["csa"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn is_text_based(&self) -> bool {
        true
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let text = read_source_text(location, stdio)?;
        let values = text
            .trim()
            .split(',')
            .map(|atom| Value::infer_from_text(atom.trim()))
            .collect();
        Ok(Loaded::table(Table::from_array(values)))
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let values = require_array(table, location.scheme())?;
        let text = join_text(&values, ",");
        write_destination(location, stdio, text.as_bytes())
    }
}

/// A JSON array of scalars (`jsonarray`).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonArrayAdapter;

impl Adapter for JsonArrayAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["jsonarray"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let text = read_source_text(location, stdio)?;
        let parsed: serde_json::Value = serde_json::from_str(text.trim())?;
        let items = parsed.as_array().ok_or_else(|| AdapterError::Malformed {
            message: "jsonarray input must be a JSON array".to_string(),
        })?;
        let values = items.iter().map(Value::from_json).collect();
        Ok(Loaded::table(Table::from_array(values)))
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let values = require_array(table, location.scheme())?;
        let array = serde_json::Value::Array(values.iter().map(|v| v.to_json()).collect());
        let mut bytes = serde_json::to_vec(&array)?;
        bytes.push(b'\n');
        write_destination(location, stdio, &bytes)
    }
}

/// A Python list literal (`pylist`), write-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PyListAdapter;

impl Adapter for PyListAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["pylist"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::WRITE_ONLY
    }

    fn is_text_based(&self) -> bool {
        true
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let values = require_array(table, location.scheme())?;
        let items: Vec<String> = values.iter().map(|v| py_repr(v)).collect();
        let text = format!("[{}]\n", items.join(", "));
        write_destination(location, stdio, text.as_bytes())
    }
}

fn join_text(values: &[&Value], sep: &str) -> String {
    values.iter().map(|v| v.to_text()).collect::<Vec<_>>().join(sep)
}

fn py_repr(v: &Value) -> String {
    match v {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int64(i) => i.to_string(),
        Value::Float64(f) if f.is_nan() => "float('nan')".to_string(),
        Value::Float64(f) if f.is_infinite() => {
            if *f > 0.0 { "float('inf')" } else { "-float('inf')" }.to_string()
        }
        Value::Float64(f) => format_float(*f),
        Value::Utf8(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('\'');
            for ch in s.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '\'' => out.push_str("\\'"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out.push('\'');
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::{dump_str, load_str};
    use crate::types::ARRAY_COLUMN;

    fn abc() -> Table {
        Table::from_array(vec![
            Value::Utf8("a".into()),
            Value::Utf8("b".into()),
            Value::Utf8("c".into()),
        ])
    }

    #[test]
    fn list_loads_one_value_per_line() {
        let t = load_str(&ListAdapter, "list:-", "a\r\n1\n\nc\n").unwrap();
        assert_eq!(t.columns, vec![ARRAY_COLUMN]);
        assert_eq!(
            t.rows,
            vec![
                vec![Value::Utf8("a".into())],
                vec![Value::Int64(1)],
                vec![Value::Null],
                vec![Value::Utf8("c".into())],
            ]
        );
    }

    #[test]
    fn list_and_csa_have_no_trailing_newline() {
        assert_eq!(dump_str(&ListAdapter, "list:-", &abc()).unwrap(), "a\nb\nc");
        assert_eq!(dump_str(&CsaAdapter, "csa:-", &abc()).unwrap(), "a,b,c");
    }

    #[test]
    fn csa_trims_atoms() {
        let t = load_str(&CsaAdapter, "csa:-", " a, 2 ,3.5\n").unwrap();
        assert_eq!(
            t.rows,
            vec![vec![Value::Utf8("a".into())], vec![Value::Int64(2)], vec![Value::Float64(3.5)]]
        );
    }

    #[test]
    fn jsonarray_keeps_native_types() {
        let t = load_str(&JsonArrayAdapter, "jsonarray:-", r#"["a", 1, null, {"k": 2}]"#).unwrap();
        assert_eq!(
            t.rows,
            vec![
                vec![Value::Utf8("a".into())],
                vec![Value::Int64(1)],
                vec![Value::Null],
                vec![Value::Utf8(r#"{"k":2}"#.into())],
            ]
        );
        assert_eq!(dump_str(&JsonArrayAdapter, "jsonarray:-", &abc()).unwrap(), "[\"a\",\"b\",\"c\"]\n");
    }

    #[test]
    fn jsonarray_rejects_objects() {
        let err = load_str(&JsonArrayAdapter, "jsonarray:-", r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, AdapterError::Malformed { .. }));
    }

    #[test]
    fn pylist_renders_python_literals() {
        let t = Table::from_array(vec![
            Value::Utf8("it's".into()),
            Value::Int64(3),
            Value::Float64(1.0),
            Value::Bool(true),
            Value::Null,
        ]);
        assert_eq!(
            dump_str(&PyListAdapter, "pylist:-", &t).unwrap(),
            "['it\\'s', 3, 1.0, True, None]\n"
        );
    }

    #[test]
    fn any_single_column_name_is_accepted() {
        let t = Table::new(vec!["name".into()], vec![vec![Value::Utf8("George".into())]]);
        assert_eq!(dump_str(&CsaAdapter, "csa:-", &t).unwrap(), "George");
    }

    #[test]
    fn wide_tables_are_rejected() {
        let t = Table::new(vec!["a".into(), "b".into()], vec![vec![Value::Int64(1), Value::Int64(2)]]);
        let err = dump_str(&ListAdapter, "list:-", &t).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams { .. }));
        assert!(err.to_string().contains("2 columns"));
    }
}
