//! SQLite adapter (`sqlite`, `sqlite3`).
//!
//! As a source, the primary query runs directly against the database file, so it may reference
//! any table in it; the filter query still runs later against `data`. Without a query, the table
//! named by `?table=` is read whole.
//!
//! As a destination, `?table=` is required. An existing table is left alone unless
//! `?if_exists=replace` (or `overwrite=true`) or `?if_exists=append` (or `append=true`) is given.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, Transaction};

use crate::error::{AdapterError, AdapterResult};
use crate::query::{non_blank, quote_ident, read_statement, run_query, to_sql_value};
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::types::{DataType, Table, Value};
use crate::uri::Location;

/// What to do when the destination table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfExists {
    /// Refuse the write.
    Fail,
    /// Drop and recreate the table.
    Replace,
    /// Insert after the existing rows.
    Append,
}

impl IfExists {
    /// Resolve from `?if_exists=`, then `?append=`, then `?overwrite=`. Defaults to [`IfExists::Fail`].
    pub fn from_location(location: &Location) -> AdapterResult<Self> {
        if let Some(raw) = location.param("if_exists") {
            return match raw {
                "fail" | "error" => Ok(IfExists::Fail),
                "replace" => Ok(IfExists::Replace),
                "append" => Ok(IfExists::Append),
                other => Err(AdapterError::InvalidParams {
                    message: format!("`if_exists` must be one of fail, replace, append (got '{other}')"),
                }),
            };
        }
        if location.flag("append") {
            Ok(IfExists::Append)
        } else if location.flag("overwrite") {
            Ok(IfExists::Replace)
        } else {
            Ok(IfExists::Fail)
        }
    }
}

/// SQLite database files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteAdapter;

impl Adapter for SqliteAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["sqlite", "sqlite3"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn example_url(&self, scheme: &str) -> String {
        format!("{scheme}:///path/to/file.db?table=name")
    }

    fn load(&self, location: &Location, query: Option<&str>, _stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let path = db_path(location)?;
        if !Path::new(&path).exists() {
            return Err(AdapterError::NotFound { path });
        }
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        if let Some(query) = non_blank(query) {
            return Ok(Loaded::queried(run_query(&conn, query)?));
        }

        let Some(table) = location.param("table") else {
            return Err(AdapterError::InvalidParams {
                message: format!(
                    "reading {path} needs a table: pass ?table=NAME or a query. tables={:?}",
                    table_names(&conn)?
                ),
            });
        };
        if !table_exists(&conn, table)? {
            return Err(AdapterError::InvalidParams {
                message: format!(
                    "table '{table}' not found in {path}. tables={:?}",
                    table_names(&conn)?
                ),
            });
        }
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        Ok(Loaded::table(read_statement(&mut stmt)?))
    }

    fn dump(&self, table: &Table, location: &Location, _stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let path = db_path(location)?;
        let name = location.param("table").ok_or_else(|| AdapterError::InvalidParams {
            message: format!("writing {path} needs a destination table: pass ?table=NAME"),
        })?;
        if table.columns.is_empty() {
            return Err(AdapterError::InvalidParams {
                message: "cannot create a table without columns".to_string(),
            });
        }
        let if_exists = IfExists::from_location(location)?;

        let mut conn = Connection::open(&path)?;
        let tx = conn.transaction()?;
        let exists = table_exists(&tx, name)?;
        match (exists, if_exists) {
            (true, IfExists::Fail) => {
                return Err(AdapterError::TableAlreadyExists {
                    message: format!(
                        "'{name}' in {path}; pass ?if_exists=replace or ?if_exists=append"
                    ),
                });
            }
            (true, IfExists::Replace) => {
                tx.execute_batch(&format!("DROP TABLE {}", quote_ident(name)))?;
                create_table(&tx, name, table)?;
            }
            (true, IfExists::Append) => {}
            (false, _) => create_table(&tx, name, table)?,
        }
        insert_rows(&tx, name, table)?;
        tx.commit()?;

        Ok(format!("{path}?table={name}"))
    }
}

fn db_path(location: &Location) -> AdapterResult<String> {
    if location.is_stdio() {
        return Err(AdapterError::InvalidParams {
            message: "sqlite needs a database file path, not '-'".to_string(),
        });
    }
    Ok(location.file_path())
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}

fn table_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    names.collect()
}

fn sql_type(dt: DataType) -> &'static str {
    match dt {
        DataType::Int64 | DataType::Bool => "INTEGER",
        DataType::Float64 => "REAL",
        DataType::Utf8 => "TEXT",
    }
}

fn create_table(tx: &Transaction<'_>, name: &str, table: &Table) -> rusqlite::Result<()> {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} {}", quote_ident(c), sql_type(table.column_type(i))))
        .collect::<Vec<_>>()
        .join(", ");
    tx.execute_batch(&format!("CREATE TABLE {} ({columns})", quote_ident(name)))
}

fn insert_rows(tx: &Transaction<'_>, name: &str, table: &Table) -> rusqlite::Result<()> {
    let types: Vec<DataType> = (0..table.columns.len()).map(|i| table.column_type(i)).collect();
    let columns = table
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; table.columns.len()].join(", ");
    let mut insert = tx.prepare(&format!(
        "INSERT INTO {} ({columns}) VALUES ({placeholders})",
        quote_ident(name)
    ))?;

    for row in &table.rows {
        let params = row.iter().zip(&types).map(|(v, dt)| match (v, dt) {
            (Value::Null, _) => SqlValue::Null,
            // Mixed columns are stored as text, matching their declared type.
            (v, DataType::Utf8) => SqlValue::Text(v.to_text()),
            (v, _) => to_sql_value(v),
        });
        insert.execute(rusqlite::params_from_iter(params))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_db(name: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("tabconv-{name}-{nanos}.db"))
            .display()
            .to_string()
    }

    fn people() -> Table {
        Table::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![Value::Int64(1), Value::Utf8("George".into())],
                vec![Value::Int64(2), Value::Utf8("Steven".into())],
            ],
        )
    }

    fn dump(table: &Table, uri: &str) -> AdapterResult<String> {
        let loc = Location::parse(uri).unwrap();
        let mut inp: &[u8] = &[];
        let mut out: Vec<u8> = Vec::new();
        SqliteAdapter.dump(table, &loc, &mut Stdio::new(&mut inp, &mut out))
    }

    fn load(uri: &str, query: Option<&str>) -> AdapterResult<Loaded> {
        let loc = Location::parse(uri).unwrap();
        let mut inp: &[u8] = &[];
        let mut out: Vec<u8> = Vec::new();
        SqliteAdapter.load(&loc, query, &mut Stdio::new(&mut inp, &mut out))
    }

    #[test]
    fn write_then_read_table() {
        let db = tmp_db("rw");
        dump(&people(), &format!("sqlite://{db}?table=people")).unwrap();
        let loaded = load(&format!("sqlite://{db}?table=people"), None).unwrap();
        assert!(!loaded.query_applied);
        assert_eq!(loaded.table, people());
        let _ = std::fs::remove_file(&db);
    }

    #[test]
    fn query_is_pushed_down() {
        let db = tmp_db("pushdown");
        dump(&people(), &format!("sqlite://{db}?table=people")).unwrap();
        let loaded = load(&format!("sqlite://{db}"), Some("SELECT name FROM people WHERE id = 2")).unwrap();
        assert!(loaded.query_applied);
        assert_eq!(loaded.table.rows, vec![vec![Value::Utf8("Steven".into())]]);

        let err = load(&format!("sqlite://{db}"), Some("SELECT * FROM nope")).unwrap_err();
        assert!(matches!(err, AdapterError::Query(_)));

        let loaded = load(&format!("sqlite://{db}?table=people"), Some(" ")).unwrap();
        assert!(!loaded.query_applied);
        assert_eq!(loaded.table, people());
        let _ = std::fs::remove_file(&db);
    }

    #[test]
    fn existing_table_needs_if_exists() {
        let db = tmp_db("exists");
        let uri = format!("sqlite://{db}?table=people");
        dump(&people(), &uri).unwrap();

        let err = dump(&people(), &uri).unwrap_err();
        assert!(matches!(err, AdapterError::TableAlreadyExists { .. }));

        dump(&people(), &format!("{uri}&if_exists=append")).unwrap();
        assert_eq!(load(&uri, None).unwrap().table.row_count(), 4);

        dump(&people(), &format!("{uri}&overwrite=true")).unwrap();
        assert_eq!(load(&uri, None).unwrap().table.row_count(), 2);
        let _ = std::fs::remove_file(&db);
    }

    #[test]
    fn missing_table_param_mentions_table() {
        let db = tmp_db("noparam");
        dump(&people(), &format!("sqlite://{db}?table=people")).unwrap();
        let err = load(&format!("sqlite://{db}"), None).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams { .. }));
        assert!(err.to_string().contains("table"));
        assert!(err.to_string().contains("people"));

        let err = dump(&people(), &format!("sqlite://{db}")).unwrap_err();
        assert!(err.to_string().contains("table"));
        let _ = std::fs::remove_file(&db);
    }

    #[test]
    fn missing_database_is_not_found() {
        let err = load("sqlite:///tmp/tabconv-missing-4f1c2a.db?table=t", None).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("tabconv-missing-4f1c2a.db"));
    }

    #[test]
    fn if_exists_resolution() {
        let loc = |q: &str| Location::parse(&format!("sqlite:///x.db?{q}")).unwrap();
        assert_eq!(IfExists::from_location(&loc("table=t")).unwrap(), IfExists::Fail);
        assert_eq!(IfExists::from_location(&loc("if_exists=error")).unwrap(), IfExists::Fail);
        assert_eq!(IfExists::from_location(&loc("append=true")).unwrap(), IfExists::Append);
        assert_eq!(IfExists::from_location(&loc("append=false")).unwrap(), IfExists::Fail);
        assert_eq!(IfExists::from_location(&loc("overwrite=1")).unwrap(), IfExists::Replace);
        assert!(IfExists::from_location(&loc("if_exists=upsert")).is_err());
    }

    #[test]
    fn mixed_columns_are_stored_as_text() {
        let db = tmp_db("mixed");
        let t = Table::new(
            vec!["v".into()],
            vec![vec![Value::Int64(1)], vec![Value::Utf8("x".into())]],
        );
        dump(&t, &format!("sqlite://{db}?table=m")).unwrap();
        let back = load(&format!("sqlite://{db}?table=m"), None).unwrap().table;
        assert_eq!(back.rows, vec![vec![Value::Utf8("1".into())], vec![Value::Utf8("x".into())]]);
        let _ = std::fs::remove_file(&db);
    }
}
