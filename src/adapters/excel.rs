//! Spreadsheet adapter (`xls`).
//!
//! Reads `.xls`, `.xlsx`, `.xlsm` and `.ods` through `calamine` (format sniffed from content) and
//! writes `.xlsx` through `rust_xlsxwriter`. Both directions need the `excel` feature; without
//! it the scheme is still registered, listed as disabled, and refused at resolve time.
//!
//! Reading:
//! - Picks `?sheet=` if provided; otherwise uses the first sheet in the workbook
//! - Detects the first non-empty row as the header row
//! - Keeps native cell types; whole-number floats come back as integers

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::types::Table;
use crate::uri::Location;

/// Excel/OpenDocument workbooks (`xls`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ExcelAdapter;

impl Adapter for ExcelAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["xls"]
    }

    fn capabilities(&self) -> Capabilities {
        if cfg!(feature = "excel") {
            Capabilities::READ_WRITE
        } else {
            Capabilities::NONE
        }
    }

    fn example_url(&self, scheme: &str) -> String {
        let url = format!("{scheme}:///path/to/file.xlsx?sheet=Sheet1");
        if cfg!(feature = "excel") {
            url
        } else {
            format!("{url} (rebuild with --features excel)")
        }
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let bytes = super::read_source_bytes(location, stdio)?;
        read_workbook(bytes, location.param("sheet")).map(Loaded::table)
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let bytes = write_workbook(table, location.param("sheet"))?;
        super::write_destination(location, stdio, &bytes)
    }
}

#[cfg(not(feature = "excel"))]
fn read_workbook(_bytes: Vec<u8>, _sheet: Option<&str>) -> AdapterResult<Table> {
    Err(feature_disabled())
}

#[cfg(not(feature = "excel"))]
fn write_workbook(_table: &Table, _sheet: Option<&str>) -> AdapterResult<Vec<u8>> {
    Err(feature_disabled())
}

#[cfg(not(feature = "excel"))]
fn feature_disabled() -> AdapterError {
    AdapterError::Unsupported {
        message: "spreadsheet support is not compiled in; rebuild with `--features excel`".to_string(),
    }
}

#[cfg(feature = "excel")]
pub use enabled::{read_workbook, write_workbook};

#[cfg(feature = "excel")]
mod enabled {
    use std::io::Cursor;

    use calamine::{Data, Reader, open_workbook_auto_from_rs};
    use rust_xlsxwriter::Workbook;

    use super::*;
    use crate::types::Value;

    /// Read one sheet of a workbook held in memory.
    pub fn read_workbook(bytes: Vec<u8>, sheet: Option<&str>) -> AdapterResult<Table> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let names = workbook.sheet_names();

        let name = match sheet {
            Some(s) if names.iter().any(|n| n == s) => s.to_string(),
            Some(s) => {
                return Err(AdapterError::InvalidParams {
                    message: format!("sheet '{s}' not found. sheets={names:?}"),
                });
            }
            None => names.first().cloned().ok_or_else(|| AdapterError::EmptySource {
                message: "workbook has no sheets".to_string(),
            })?,
        };

        let range = workbook.worksheet_range(&name)?;
        Ok(read_range(&range))
    }

    fn read_range(range: &calamine::Range<Data>) -> Table {
        let mut rows_iter = range
            .rows()
            .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

        let Some(header) = rows_iter.next() else {
            return Table::default();
        };
        let columns: Vec<String> = header.iter().map(cell_to_header_string).collect();

        let rows = rows_iter
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        Table::new(columns, rows)
    }

    fn cell_to_header_string(c: &Data) -> String {
        match c {
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) if f.fract() == 0.0 => (*f as i64).to_string(),
            Data::Empty => String::new(),
            other => other.to_string(),
        }
    }

    fn convert_cell(c: &Data) -> Value {
        match c {
            Data::Empty => Value::Null,
            Data::Bool(b) => Value::Bool(*b),
            Data::Int(i) => Value::Int64(*i),
            // Whole numbers are stored as floats by spreadsheet formats.
            Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Int64(*f as i64),
            Data::Float(f) => Value::Float64(*f),
            Data::String(s) => Value::Utf8(s.clone()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
            Data::DateTime(d) => Value::Utf8(d.to_string()),
            Data::Error(e) => Value::Utf8(format!("{e:?}")),
        }
    }

    /// Write `table` as a single-sheet `.xlsx` workbook: header row, then one row per record.
    pub fn write_workbook(table: &Table, sheet: Option<&str>) -> AdapterResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        if let Some(name) = sheet {
            ws.set_name(name)?;
        }

        for (c, name) in table.columns.iter().enumerate() {
            ws.write_string(0, to_col(c)?, name)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let xr = u32::try_from(r + 1).map_err(|_| too_large("rows"))?;
            for (c, v) in row.iter().enumerate() {
                let xc = to_col(c)?;
                match v {
                    Value::Null => {}
                    Value::Bool(b) => {
                        ws.write_boolean(xr, xc, *b)?;
                    }
                    Value::Int64(i) => {
                        ws.write_number(xr, xc, *i as f64)?;
                    }
                    Value::Float64(f) => {
                        ws.write_number(xr, xc, *f)?;
                    }
                    Value::Utf8(s) => {
                        ws.write_string(xr, xc, s)?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn to_col(c: usize) -> AdapterResult<u16> {
        u16::try_from(c).map_err(|_| too_large("columns"))
    }

    fn too_large(what: &str) -> AdapterError {
        AdapterError::InvalidParams {
            message: format!("too many {what} for a worksheet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "excel"))]
    #[test]
    fn disabled_build_reports_unsupported() {
        assert_eq!(ExcelAdapter.capabilities(), Capabilities::NONE);
        assert!(ExcelAdapter.example_url("xls").contains("--features excel"));

        let err = write_workbook(&Table::default(), None).unwrap_err();
        assert!(matches!(err, AdapterError::Unsupported { .. }));
        assert!(err.to_string().contains("--features excel"));
    }

    #[cfg(feature = "excel")]
    mod enabled_tests {
        use super::*;
        use crate::types::Value;

        fn people() -> Table {
            Table::new(
                vec!["id".into(), "name".into(), "score".into(), "active".into()],
                vec![
                    vec![Value::Int64(1), Value::Utf8("Ada".into()), Value::Float64(98.5), Value::Bool(true)],
                    vec![Value::Int64(2), Value::Null, Value::Float64(3.0), Value::Bool(false)],
                ],
            )
        }

        #[test]
        fn workbook_round_trip() {
            let bytes = write_workbook(&people(), None).unwrap();
            let back = read_workbook(bytes, None).unwrap();
            assert_eq!(back.columns, people().columns);
            assert_eq!(back.rows[0], people().rows[0]);
            // Whole floats read back as integers.
            assert_eq!(back.rows[1][2], Value::Int64(3));
            assert_eq!(back.rows[1][1], Value::Null);
        }

        #[test]
        fn sheet_param_selects_and_validates() {
            let bytes = write_workbook(&people(), Some("People")).unwrap();
            assert_eq!(read_workbook(bytes.clone(), Some("People")).unwrap().row_count(), 2);
            let err = read_workbook(bytes, Some("Nope")).unwrap_err();
            assert!(matches!(err, AdapterError::InvalidParams { .. }));
            assert!(err.to_string().contains("People"));
        }
    }
}
