//! Parquet adapter.
//!
//! Reading goes through the Parquet record API (`RowIter`), one [`Value`] per top-level field.
//! Writing declares every column `OPTIONAL` with the type from [`Table::column_type`], so a
//! mixed column is written as UTF8 text.

use std::sync::Arc;

use bytes::Bytes;
use parquet::basic::{ConvertedType, LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{ChunkReader, FileReader};
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::{SerializedColumnWriter, SerializedFileWriter};
use parquet::record::Field;
use parquet::schema::types::Type;

use crate::error::AdapterResult;
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::types::{DataType, Table, Value};
use crate::uri::Location;

use super::{read_source_bytes, write_destination};

/// Apache Parquet files (`parquet`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ParquetAdapter;

impl Adapter for ParquetAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["parquet"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_WRITE
    }

    fn example_url(&self, scheme: &str) -> String {
        format!("{scheme}:///path/to/file.parquet")
    }

    fn load(&self, location: &Location, _query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let bytes = Bytes::from(read_source_bytes(location, stdio)?);
        let reader = SerializedFileReader::new(bytes)?;
        read_parquet(&reader).map(Loaded::table)
    }

    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let bytes = write_parquet(table)?;
        write_destination(location, stdio, &bytes)
    }
}

/// Read every row of an open Parquet file.
pub fn read_parquet<R: ChunkReader + 'static>(reader: &SerializedFileReader<R>) -> AdapterResult<Table> {
    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .root_schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for row_res in reader.get_row_iter(None)? {
        let row = row_res?;
        rows.push(row.get_column_iter().map(|(_, field)| convert_field(field)).collect());
    }

    Ok(Table::new(columns, rows))
}

fn convert_field(f: &Field) -> Value {
    match f {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Byte(v) => Value::Int64(i64::from(*v)),
        Field::Short(v) => Value::Int64(i64::from(*v)),
        Field::Int(v) => Value::Int64(i64::from(*v)),
        Field::Long(v) => Value::Int64(*v),
        Field::UByte(v) => Value::Int64(i64::from(*v)),
        Field::UShort(v) => Value::Int64(i64::from(*v)),
        Field::UInt(v) => Value::Int64(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).map_or(Value::Float64(*v as f64), Value::Int64),
        Field::Float(v) => Value::Float64(f64::from(*v)),
        Field::Double(v) => Value::Float64(*v),
        Field::Str(s) => Value::Utf8(s.clone()),
        // Dates, timestamps, decimals, binary and nested groups keep their display form.
        other => Value::Utf8(other.to_string()),
    }
}

/// Serialize `table` into an in-memory Parquet file.
pub fn write_parquet(table: &Table) -> AdapterResult<Vec<u8>> {
    let types: Vec<DataType> = (0..table.columns.len()).map(|i| table.column_type(i)).collect();
    let schema = Arc::new(build_schema(&table.columns, &types)?);
    let props = Arc::new(WriterProperties::builder().build());

    let mut buf: Vec<u8> = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buf, schema, props)?;
    if !table.is_empty() {
        let mut rg = writer.next_row_group()?;
        let mut col_idx: usize = 0;
        while let Some(mut col) = rg.next_column()? {
            let dt = types.get(col_idx).copied().unwrap_or(DataType::Utf8);
            write_column(&mut col, table, col_idx, dt)?;
            col.close()?;
            col_idx += 1;
        }
        rg.close()?;
    }
    writer.close()?;
    Ok(buf)
}

fn build_schema(columns: &[String], types: &[DataType]) -> AdapterResult<Type> {
    let fields = columns
        .iter()
        .zip(types)
        .map(|(name, dt)| {
            let builder = match dt {
                DataType::Int64 => Type::primitive_type_builder(name, PhysicalType::INT64),
                DataType::Float64 => Type::primitive_type_builder(name, PhysicalType::DOUBLE),
                DataType::Bool => Type::primitive_type_builder(name, PhysicalType::BOOLEAN),
                DataType::Utf8 => Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
                    .with_logical_type(Some(LogicalType::String))
                    .with_converted_type(ConvertedType::UTF8),
            };
            builder
                .with_repetition(Repetition::OPTIONAL)
                .build()
                .map(Arc::new)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Type::group_type_builder("schema").with_fields(fields).build()?)
}

fn write_column(col: &mut SerializedColumnWriter<'_>, table: &Table, idx: usize, dt: DataType) -> AdapterResult<()> {
    let defs: Vec<i16> = table.column_values(idx).map(|v| i16::from(!v.is_null())).collect();
    let present = || table.column_values(idx).filter(|v| !v.is_null());

    match dt {
        DataType::Int64 => {
            let vals: Vec<i64> = present()
                .filter_map(|v| match v {
                    Value::Int64(i) => Some(*i),
                    _ => None,
                })
                .collect();
            col.typed::<Int64Type>().write_batch(&vals, Some(&defs), None)?;
        }
        DataType::Float64 => {
            let vals: Vec<f64> = present()
                .filter_map(|v| match v {
                    Value::Float64(f) => Some(*f),
                    Value::Int64(i) => Some(*i as f64),
                    _ => None,
                })
                .collect();
            col.typed::<DoubleType>().write_batch(&vals, Some(&defs), None)?;
        }
        DataType::Bool => {
            let vals: Vec<bool> = present()
                .filter_map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            col.typed::<BoolType>().write_batch(&vals, Some(&defs), None)?;
        }
        DataType::Utf8 => {
            let vals: Vec<ByteArray> = present().map(|v| ByteArray::from(v.to_text().into_bytes())).collect();
            col.typed::<ByteArrayType>().write_batch(&vals, Some(&defs), None)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;

    fn reload(table: &Table) -> Table {
        let bytes = Bytes::from(write_parquet(table).unwrap());
        let reader = SerializedFileReader::new(bytes).unwrap();
        read_parquet(&reader).unwrap()
    }

    #[test]
    fn typed_columns_survive_with_nulls() {
        let t = Table::new(
            vec!["id".into(), "name".into(), "score".into(), "active".into()],
            vec![
                vec![Value::Int64(1), Value::Utf8("Ada".into()), Value::Float64(98.5), Value::Bool(true)],
                vec![Value::Int64(2), Value::Null, Value::Null, Value::Bool(false)],
            ],
        );
        assert_eq!(reload(&t), t);
    }

    #[test]
    fn int_and_float_widen_to_float() {
        let t = Table::new(vec!["n".into()], vec![vec![Value::Int64(1)], vec![Value::Float64(2.5)]]);
        assert_eq!(reload(&t).rows, vec![vec![Value::Float64(1.0)], vec![Value::Float64(2.5)]]);
    }

    #[test]
    fn mixed_columns_are_written_as_text() {
        let t = Table::new(
            vec!["v".into()],
            vec![vec![Value::Int64(1)], vec![Value::Utf8("x".into())], vec![Value::Null]],
        );
        assert_eq!(
            reload(&t).rows,
            vec![vec![Value::Utf8("1".into())], vec![Value::Utf8("x".into())], vec![Value::Null]]
        );
    }

    #[test]
    fn zero_row_table_keeps_columns() {
        let t = Table::new(vec!["a".into(), "b".into()], vec![]);
        let back = reload(&t);
        assert_eq!(back.columns, vec!["a", "b"]);
        assert!(back.is_empty());
    }

    #[test]
    fn garbage_input_is_a_parquet_error() {
        let err = crate::adapters::test_support::load_str(&ParquetAdapter, "parquet:-", "not parquet").unwrap_err();
        assert!(matches!(err, AdapterError::Parquet(_)));
    }

    #[test]
    fn output_starts_with_magic() {
        let t = Table::new(vec!["a".into()], vec![vec![Value::Int64(1)]]);
        let bytes = write_parquet(&t).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");
    }
}
