//! SQL query stage.
//!
//! The current table is bound as a relation named `data` in a fresh in-memory SQLite database,
//! the statement is executed there, and the result rows become the new table. Columns of `data`
//! are declared without a type, so every cell keeps its own storage class: integers stay
//! integers and mixed columns survive unchanged.
//!
//! Both pipeline slots (the primary query and the filter query) go through [`apply`].

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Statement};

use crate::error::QueryError;
use crate::types::{Table, Value};

/// Name of the relation the current table is bound to.
pub const DATA_TABLE: &str = "data";

/// Apply an optional query to `table`.
///
/// With `None` or a blank statement the table is returned unchanged. Otherwise the result of the statement replaces
/// it: the new columns are the projected columns in projection order, the new rows are the
/// result rows in result order.
pub fn apply(table: Table, query: Option<&str>) -> Result<Table, QueryError> {
    let Some(query) = non_blank(query) else {
        return Ok(table);
    };

    let conn = Connection::open_in_memory().map_err(|e| query_error(query, e))?;
    bind_table(&conn, DATA_TABLE, &table).map_err(|e| query_error(query, e))?;
    run_query(&conn, query)
}

/// Drop a statement that is empty or whitespace only.
pub(crate) fn non_blank(query: Option<&str>) -> Option<&str> {
    query.filter(|q| !q.trim().is_empty())
}

/// Execute `query` on `conn` and materialize the result.
pub(crate) fn run_query(conn: &Connection, query: &str) -> Result<Table, QueryError> {
    let mut stmt = conn.prepare(query).map_err(|e| query_error(query, e))?;
    read_statement(&mut stmt).map_err(|e| query_error(query, e))
}

/// Create `name` in `conn` with untyped columns and insert every row of `table`.
fn bind_table(conn: &Connection, name: &str, table: &Table) -> rusqlite::Result<()> {
    let columns = table
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    if columns.is_empty() {
        conn.execute_batch(&format!("CREATE TABLE {} (_empty)", quote_ident(name)))?;
        return Ok(());
    }
    conn.execute_batch(&format!("CREATE TABLE {} ({columns})", quote_ident(name)))?;

    let placeholders = vec!["?"; table.columns.len()].join(", ");
    let mut insert = conn.prepare(&format!(
        "INSERT INTO {} VALUES ({placeholders})",
        quote_ident(name)
    ))?;
    for row in &table.rows {
        insert.execute(rusqlite::params_from_iter(row.iter().map(to_sql_value)))?;
    }
    Ok(())
}

/// Run a prepared statement and collect its rows into a [`Table`].
pub(crate) fn read_statement(stmt: &mut Statement<'_>) -> rusqlite::Result<Table> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let width = columns.len();

    let mut rows_out: Vec<Vec<Value>> = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut out = Vec::with_capacity(width);
        for idx in 0..width {
            out.push(from_sql_ref(row.get_ref(idx)?));
        }
        rows_out.push(out);
    }
    Ok(Table::new(columns, rows_out))
}

/// Convert a cell to an SQLite value. Booleans bind as 0/1.
pub(crate) fn to_sql_value(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Utf8(s) => SqlValue::Text(s.clone()),
    }
}

/// Convert an SQLite cell to a [`Value`]. Blobs are rendered as lowercase hex text.
pub(crate) fn from_sql_ref(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(bytes) => Value::Utf8(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Utf8(bytes.iter().map(|b| format!("{b:02x}")).collect()),
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn query_error(query: &str, err: rusqlite::Error) -> QueryError {
    QueryError {
        query: query.to_string(),
        message: err.to_string(),
    }
}
