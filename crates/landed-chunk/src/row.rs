use std::path::Path;

use landed_domain::{Record, SchemaColumn};

use crate::columnar::infer_schema;
use crate::error::ChunkError;
use crate::text::cell_text;

/// Row-delimited format (§4.5): UTF-8, header row, comma-separated, values
/// escaped per RFC 4180 quoting rules — the `csv` crate's default writer
/// behavior.
pub fn write_row_delimited(records: &[Record], path: &Path) -> Result<Vec<SchemaColumn>, ChunkError> {
    let schema_columns = infer_schema(records);
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_path(path)?;

    let header: Vec<&str> = schema_columns.iter().map(|c| c.name.as_str()).collect();
    writer.write_record(&header)?;

    for record in records {
        let row: Vec<String> = schema_columns
            .iter()
            .map(|c| record.get(&c.name).map(cell_text).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(schema_columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use landed_domain::Value;

    #[test]
    fn writes_header_and_escapes_commas() {
        let mut r = Record::new();
        r.insert("id".to_string(), Value::Int(1));
        r.insert("note".to_string(), Value::Str("a, b".to_string()));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part-0001.csv");
        write_row_delimited(&[r], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("id,note\n"));
        assert!(content.contains("\"a, b\""));
    }
}
