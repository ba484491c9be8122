//! JSON-Lines file tables: `<table>.jsonl` holds one row per line and
//! `metadata.jsonl` one `{"table_name", "columns"}` object per line.

use jsonsql_core::{Error, Result, Row};

use crate::file::{FileFormat, FileTables, TableSchema};

/// One JSON value per line; blank lines are ignored on read
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesFormat;

fn decode_lines<T: serde::de::DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

fn encode_lines<T: serde::Serialize>(items: &[T]) -> Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

impl FileFormat for JsonLinesFormat {
    const DATA_EXTENSION: &'static str = ".jsonl";
    const SCHEMA_FILE: &'static str = "metadata.jsonl";

    fn decode_rows(text: &str) -> Result<Vec<Row>> {
        decode_lines(text)
    }

    fn encode_rows(rows: &[Row]) -> Result<String> {
        encode_lines(rows)
    }

    fn decode_schema(text: &str) -> Result<Vec<TableSchema>> {
        decode_lines(text)
    }

    fn encode_schema(schema: &[TableSchema]) -> Result<String> {
        encode_lines(schema)
    }
}

/// Tables stored as JSON-Lines files in one directory
pub type JsonLinesTables = FileTables<JsonLinesFormat>;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonsql_core::{Column, ColumnType, Table, TablesSnapshot};
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_file_layout() {
        let dir = tempdir().unwrap();
        let mut tables = JsonLinesTables::open(dir.path()).unwrap();
        tables
            .add_table(
                Table::new("events", vec![Column::new("kind", ColumnType::String)])
                    .with_rows(rows(json!([{"kind": "a"}, {"kind": "b"}]))),
            )
            .unwrap();

        let data = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        assert_eq!(data, "{\"kind\":\"a\"}\n{\"kind\":\"b\"}\n");

        let schema = std::fs::read_to_string(dir.path().join("metadata.jsonl")).unwrap();
        let entry: Value = serde_json::from_str(schema.lines().next().unwrap()).unwrap();
        assert_eq!(entry["table_name"], json!("events"));
        assert_eq!(entry["columns"][0]["name"], json!("kind"));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("metadata.jsonl"),
            "\n{\"table_name\": \"t\", \"columns\": [{\"name\": \"x\", \"type\": \"int\"}]}\n\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("t.jsonl"), "{\"x\": 1}\n\n{\"x\": 2}\n").unwrap();

        let tables = JsonLinesTables::open(dir.path()).unwrap();
        let table = tables.get_table("t").unwrap().unwrap();
        assert_eq!(table.data, rows(json!([{"x": 1}, {"x": 2}])));
    }

    #[test]
    fn test_insert_fills_defaults_and_appends() {
        let dir = tempdir().unwrap();
        let mut tables = JsonLinesTables::open(dir.path()).unwrap();
        tables
            .add_table(Table::new(
                "t",
                vec![
                    Column::new("x", ColumnType::Int),
                    Column::new("ok", ColumnType::Bool).with_default(json!(false)),
                ],
            ))
            .unwrap();

        tables.insert("t", rows(json!([{"x": 1}])).remove(0)).unwrap();
        tables
            .insert("t", rows(json!([{"x": 2, "ok": true}])).remove(0))
            .unwrap();

        let table = tables.get_table("t").unwrap().unwrap();
        assert_eq!(
            table.data,
            rows(json!([{"x": 1, "ok": false}, {"x": 2, "ok": true}]))
        );
    }

    #[test]
    fn test_rename_and_remove_table() {
        let dir = tempdir().unwrap();
        let mut tables = JsonLinesTables::open(dir.path()).unwrap();
        tables.add_table(Table::new("a", vec![])).unwrap();

        tables.rename_table("a", "b").unwrap();
        assert!(dir.path().join("b.jsonl").exists());
        assert!(!dir.path().join("a.jsonl").exists());
        assert_eq!(tables.table_names().unwrap(), vec!["b".to_string()]);

        tables.remove_table("b").unwrap();
        assert!(tables.get_table("b").unwrap().is_none());
    }
}
