//! Core row model types.
//!
//! Every adapter produces and consumes a [`Table`]: an ordered list of unique column names and
//! a row-major list of [`Value`] cells aligned to those columns.

use std::fmt;

/// Name of the single column used when an array (scalar list) becomes a table.
pub const ARRAY_COLUMN: &str = "value";

/// Logical type of a whole column, used by strictly-typed writers (Parquet, SQLite, Excel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single scalar cell in a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string. Composite values (nested lists/objects) are carried here as serialized text.
    Utf8(String),
}

impl Value {
    /// Infer a scalar from a lexically textual cell.
    ///
    /// - empty string → [`Value::Null`]
    /// - integer literal (optional sign, no leading zero unless the digits are exactly `0`)
    ///   → [`Value::Int64`]
    /// - float literal (decimal point and/or exponent, same leading-zero rule) → [`Value::Float64`]
    /// - anything else stays [`Value::Utf8`]
    ///
    /// Inference is per cell; a column may end up with mixed kinds.
    pub fn infer_from_text(raw: &str) -> Self {
        if raw.is_empty() {
            return Value::Null;
        }
        if is_integer_literal(raw) {
            if let Ok(v) = raw.parse::<i64>() {
                return Value::Int64(v);
            }
            // Out of i64 range: keep the magnitude as a float.
            if let Ok(v) = raw.parse::<f64>() {
                return Value::Float64(v);
            }
        }
        if is_float_literal(raw) {
            if let Ok(v) = raw.parse::<f64>() {
                return Value::Float64(v);
            }
        }
        Value::Utf8(raw.to_owned())
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the cell for a text format. Nulls render as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => format_float(*v),
            Value::Utf8(s) => s.clone(),
        }
    }

    /// Convert to a JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Utf8(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Convert from a natively-typed JSON value (no text inference).
    ///
    /// Arrays and objects are kept as their compact JSON text.
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else {
                    n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
                }
            }
            serde_json::Value::String(s) => Value::Utf8(s.clone()),
            composite => Value::Utf8(composite.to_string()),
        }
    }

    fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Utf8(_) => Some(DataType::Utf8),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Format a float so it never reads back as an integer (`1.0` stays `1.0`, not `1`).
///
/// Integral values of any magnitude keep the `.0` suffix; `{:.1}` is exact for them.
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn has_valid_leading_digits(digits: &str) -> bool {
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

fn is_integer_literal(s: &str) -> bool {
    has_valid_leading_digits(strip_sign(s))
}

fn is_float_literal(s: &str) -> bool {
    let body = strip_sign(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };
    if let Some(exp) = exponent {
        let exp_digits = strip_sign(exp);
        if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (mantissa, None),
    };
    if frac_part.is_none() && exponent.is_none() {
        return false;
    }
    if let Some(frac) = frac_part {
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if int_part.is_empty() {
            return !frac.is_empty();
        }
    }
    has_valid_leading_digits(int_part)
}

/// In-memory table: the row model passed between pipeline stages.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as [`Table::columns`]. A cell absent
/// from a source row is stored as [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Ordered, unique column names (display order).
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from columns and rows.
    ///
    /// Duplicate column names are made unique (see [`unique_column_names`]) and every row is
    /// padded with nulls (or truncated) to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = unique_column_names(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a table from an array of scalars, materialized as a single column named `value`.
    pub fn from_array(values: Vec<Value>) -> Self {
        Self {
            columns: vec![ARRAY_COLUMN.to_string()],
            rows: values.into_iter().map(|v| vec![v]).collect(),
        }
    }

    /// View a single-column table as an array of scalars.
    ///
    /// Returns `None` if the table does not have exactly one column (any name is accepted).
    pub fn as_array(&self) -> Option<Vec<&Value>> {
        if self.columns.len() != 1 {
            return None;
        }
        Some(self.rows.iter().map(|row| row.first().unwrap_or(&Value::Null)).collect())
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over the cells of one column.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| row.get(idx).unwrap_or(&Value::Null))
    }

    /// Logical type of a column, for writers that need a single type per column.
    ///
    /// Int64 mixed with Float64 widens to Float64. Any other mix, and an all-null column, is
    /// reported as Utf8; writers then stringify every non-null cell of that column.
    pub fn column_type(&self, idx: usize) -> DataType {
        let mut seen: Option<DataType> = None;
        for v in self.column_values(idx) {
            let Some(dt) = v.data_type() else { continue };
            seen = Some(match (seen, dt) {
                (None, dt) => dt,
                (Some(a), b) if a == b => a,
                (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                    DataType::Float64
                }
                _ => return DataType::Utf8,
            });
        }
        seen.unwrap_or(DataType::Utf8)
    }
}

/// Make column names unique by suffixing repeats with `.1`, `.2`, ...
///
/// The first occurrence of a name keeps it unchanged. Names are compared ignoring ASCII case,
/// matching how SQL resolves identifiers, so `Name` and `name` cannot both be bound.
pub fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let taken = |out: &[String], name: &str| out.iter().any(|c| c.eq_ignore_ascii_case(name));
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for name in columns {
        if !taken(&out, &name) {
            out.push(name);
            continue;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{name}.{n}");
            if !taken(&out, &candidate) {
                out.push(candidate);
                break;
            }
            n += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_integers() {
        assert_eq!(Value::infer_from_text("1"), Value::Int64(1));
        assert_eq!(Value::infer_from_text("-42"), Value::Int64(-42));
        assert_eq!(Value::infer_from_text("+7"), Value::Int64(7));
        assert_eq!(Value::infer_from_text("0"), Value::Int64(0));
        assert_eq!(Value::infer_from_text("2023"), Value::Int64(2023));
    }

    #[test]
    fn leading_zeros_stay_strings() {
        assert_eq!(Value::infer_from_text("007"), Value::Utf8("007".to_string()));
        assert_eq!(Value::infer_from_text("00.5"), Value::Utf8("00.5".to_string()));
    }

    #[test]
    fn infers_floats_including_exponents() {
        assert_eq!(Value::infer_from_text("1.5"), Value::Float64(1.5));
        assert_eq!(Value::infer_from_text("0.25"), Value::Float64(0.25));
        assert_eq!(Value::infer_from_text("-.5"), Value::Float64(-0.5));
        assert_eq!(Value::infer_from_text("1e3"), Value::Float64(1000.0));
        assert_eq!(Value::infer_from_text("2.5E-2"), Value::Float64(0.025));
    }

    #[test]
    fn non_numeric_text_stays_string() {
        for raw in ["George", "inf", "NaN", "1e", "1.2.3", "1_000", " 1", "e5", "."] {
            assert_eq!(Value::infer_from_text(raw), Value::Utf8(raw.to_string()), "raw={raw}");
        }
    }

    #[test]
    fn empty_cell_is_null() {
        assert_eq!(Value::infer_from_text(""), Value::Null);
    }

    #[test]
    fn huge_integer_falls_back_to_float() {
        assert_eq!(
            Value::infer_from_text("99999999999999999999"),
            Value::Float64(99999999999999999999.0)
        );
    }

    #[test]
    fn integral_floats_render_with_fraction() {
        assert_eq!(Value::Float64(1.0).to_text(), "1.0");
        assert_eq!(Value::Float64(2.5).to_text(), "2.5");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::infer_from_text(&Value::Float64(3.0).to_text()), Value::Float64(3.0));
    }

    #[test]
    fn json_numbers_keep_integer_fidelity() {
        let v: serde_json::Value = serde_json::from_str(r#"[1, 1.5, "x", null, [1,2]]"#).unwrap();
        let cells: Vec<Value> = v.as_array().unwrap().iter().map(Value::from_json).collect();
        assert_eq!(
            cells,
            vec![
                Value::Int64(1),
                Value::Float64(1.5),
                Value::Utf8("x".to_string()),
                Value::Null,
                Value::Utf8("[1,2]".to_string()),
            ]
        );
    }

    #[test]
    fn new_pads_short_rows_and_dedupes_columns() {
        let t = Table::new(
            vec!["a".into(), "a".into(), "b".into()],
            vec![vec![Value::Int64(1)]],
        );
        assert_eq!(t.columns, vec!["a", "a.1", "b"]);
        assert_eq!(t.rows[0], vec![Value::Int64(1), Value::Null, Value::Null]);
    }

    #[test]
    fn column_names_differing_only_in_case_are_deduped() {
        let names = unique_column_names(vec!["Name".into(), "name".into(), "NAME.1".into()]);
        assert_eq!(names, vec!["Name", "name.1", "NAME.1.1"]);
    }

    #[test]
    fn large_integral_floats_stay_floats() {
        for v in [1e16, 9.2e18, 1e300, -4e17] {
            let text = Value::Float64(v).to_text();
            assert!(text.ends_with(".0"), "{text}");
            assert_eq!(Value::infer_from_text(&text), Value::Float64(v));
        }
    }

    #[test]
    fn array_round_trip_through_table() {
        let t = Table::from_array(vec![Value::Utf8("a".into()), Value::Utf8("b".into())]);
        assert_eq!(t.columns, vec![ARRAY_COLUMN]);
        let arr = t.as_array().unwrap();
        assert_eq!(arr, vec![&Value::Utf8("a".into()), &Value::Utf8("b".into())]);
    }

    #[test]
    fn as_array_requires_single_column() {
        let t = Table::new(vec!["a".into(), "b".into()], vec![]);
        assert!(t.as_array().is_none());
    }

    #[test]
    fn column_type_widens_and_coerces_mixed_columns() {
        let t = Table::new(
            vec!["ints".into(), "nums".into(), "mixed".into(), "nulls".into(), "flags".into()],
            vec![
                vec![Value::Int64(1), Value::Int64(1), Value::Int64(1), Value::Null, Value::Bool(true)],
                vec![Value::Null, Value::Float64(2.5), Value::Utf8("x".into()), Value::Null, Value::Null],
            ],
        );
        assert_eq!(t.column_type(0), DataType::Int64);
        assert_eq!(t.column_type(1), DataType::Float64);
        assert_eq!(t.column_type(2), DataType::Utf8);
        assert_eq!(t.column_type(3), DataType::Utf8);
        assert_eq!(t.column_type(4), DataType::Bool);
    }
}
