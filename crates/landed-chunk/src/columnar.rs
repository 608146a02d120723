use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder, StringDictionaryBuilder,
    TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit, UInt32Type};
use arrow::record_batch::RecordBatch;
use landed_domain::{ColumnType, Record, SchemaColumn, Value};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::ChunkError;
use crate::text::cell_text;

/// Columns whose distinct-value ratio falls below this are dictionary-encoded
/// (§4.5 "dictionary-typed columnar encoding"); above it, plain Utf8. This
/// threshold is an implementation detail the spec leaves open (see
/// DESIGN.md).
const DICTIONARY_CARDINALITY_RATIO: f64 = 0.5;

/// Widens the observed type for every field across a chunk (§4.6 schema
/// lattice join). Field order is alphabetical since `Record` is a
/// `BTreeMap`, giving every chunk within a partition the same deterministic
/// column order.
pub fn infer_schema(records: &[Record]) -> Vec<SchemaColumn> {
    let mut types: BTreeMap<String, ColumnType> = BTreeMap::new();
    for record in records {
        for (name, value) in record {
            types
                .entry(name.clone())
                .and_modify(|t| *t = t.join(value.column_type()))
                .or_insert_with(|| value.column_type());
        }
    }
    types.into_iter().map(|(name, column_type)| SchemaColumn { name, column_type }).collect()
}

fn arrow_type(column_type: ColumnType, dictionary: bool) -> DataType {
    if dictionary {
        return DataType::Dictionary(Box::new(DataType::UInt32), Box::new(DataType::Utf8));
    }
    match column_type {
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Integer => DataType::Int64,
        ColumnType::Floating => DataType::Float64,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        ColumnType::String | ColumnType::Null | ColumnType::Mixed => DataType::Utf8,
    }
}

fn should_dictionary_encode(column: &str, records: &[Record], column_type: ColumnType) -> bool {
    if !matches!(column_type, ColumnType::String | ColumnType::Mixed) {
        return false;
    }
    let mut seen = HashSet::new();
    let mut total = 0usize;
    for record in records {
        if let Some(value) = record.get(column) {
            if !value.is_null() {
                seen.insert(cell_text(value));
                total += 1;
            }
        }
    }
    total > 0 && (seen.len() as f64 / total as f64) < DICTIONARY_CARDINALITY_RATIO
}

/// Builds one Arrow `RecordBatch` from a chunk of records and writes it to a
/// single-row-group Parquet file at `path` (§4.5 columnar format: "chunk is
/// self-describing"). Returns the inferred schema so the caller can fold it
/// into the partition-level schema snapshot (§4.6).
pub fn write_columnar(records: &[Record], path: &Path) -> Result<Vec<SchemaColumn>, ChunkError> {
    let schema_columns = infer_schema(records);
    let dictionary_flags: Vec<bool> = schema_columns
        .iter()
        .map(|c| should_dictionary_encode(&c.name, records, c.column_type))
        .collect();

    let fields: Vec<Field> = schema_columns
        .iter()
        .zip(&dictionary_flags)
        .map(|(c, dict)| Field::new(&c.name, arrow_type(c.column_type, *dict), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema_columns.len());
    for (col, dict) in schema_columns.iter().zip(&dictionary_flags) {
        columns.push(build_column(records, &col.name, col.column_type, *dict)?);
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(path)?;
    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(schema_columns)
}

fn build_column(
    records: &[Record],
    name: &str,
    column_type: ColumnType,
    dictionary: bool,
) -> Result<ArrayRef, ChunkError> {
    if dictionary {
        let mut builder = StringDictionaryBuilder::<UInt32Type>::new();
        for record in records {
            match record.get(name) {
                Some(v) if !v.is_null() => {
                    builder.append(cell_text(v))?;
                }
                _ => builder.append_null(),
            }
        }
        return Ok(Arc::new(builder.finish()) as ArrayRef);
    }

    match column_type {
        ColumnType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(records.len());
            for record in records {
                match record.get(name) {
                    Some(Value::Bool(b)) => builder.append_value(*b),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }
        ColumnType::Integer => {
            let mut builder = Int64Builder::with_capacity(records.len());
            for record in records {
                match record.get(name) {
                    Some(Value::Int(i)) => builder.append_value(*i),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }
        ColumnType::Floating => {
            let mut builder = Float64Builder::with_capacity(records.len());
            for record in records {
                match record.get(name) {
                    Some(Value::Float(f)) => builder.append_value(*f),
                    Some(Value::Int(i)) => builder.append_value(*i as f64),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }
        ColumnType::Timestamp => {
            let mut builder = TimestampMicrosecondBuilder::with_capacity(records.len());
            for record in records {
                match record.get(name) {
                    Some(Value::Timestamp(t)) => builder.append_value(t.timestamp_micros()),
                    _ => builder.append_null(),
                }
            }
            let array = builder.finish().with_timezone("UTC");
            Ok(Arc::new(array) as ArrayRef)
        }
        ColumnType::String | ColumnType::Null | ColumnType::Mixed => {
            let mut builder = StringBuilder::new();
            for record in records {
                match record.get(name) {
                    Some(v) if !v.is_null() => builder.append_value(cell_text(v)),
                    _ => builder.append_null(),
                }
            }
            Ok(Arc::new(builder.finish()) as ArrayRef)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::Value;

    fn rec(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn infers_union_of_fields_across_records() {
        let records = vec![
            rec(&[("id", Value::Int(1)), ("v", Value::Str("a".to_string()))]),
            rec(&[("id", Value::Int(2))]),
        ];
        let schema = infer_schema(&records);
        let names: Vec<_> = schema.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "v"]);
    }

    #[test]
    fn mixed_type_column_widens_to_mixed() {
        let records = vec![
            rec(&[("v", Value::Int(1))]),
            rec(&[("v", Value::Str("x".to_string()))]),
        ];
        let schema = infer_schema(&records);
        assert_eq!(schema[0].column_type, ColumnType::Mixed);
    }

    #[test]
    fn writes_a_readable_parquet_file() {
        let records = vec![
            rec(&[("id", Value::Int(1)), ("name", Value::Str("a".to_string()))]),
            rec(&[("id", Value::Int(2)), ("name", Value::Str("b".to_string()))]),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part-0001.parquet");
        let schema = write_columnar(&records, &path).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(path.exists());
    }
}
