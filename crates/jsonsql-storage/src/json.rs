//! JSON file tables: `<table>.json` holds a row array and `metadata.json`
//! maps each table name to its column list.

use jsonsql_core::{Column, Result, Row};
use serde_json::{Map, Value};

use crate::file::{FileFormat, FileTables, TableSchema};

/// Pretty-printed JSON arrays and a single schema object
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl FileFormat for JsonFormat {
    const DATA_EXTENSION: &'static str = ".json";
    const SCHEMA_FILE: &'static str = "metadata.json";

    fn decode_rows(text: &str) -> Result<Vec<Row>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(text)?)
    }

    fn encode_rows(rows: &[Row]) -> Result<String> {
        Ok(serde_json::to_string_pretty(rows)?)
    }

    fn decode_schema(text: &str) -> Result<Vec<TableSchema>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let entries: Map<String, Value> = serde_json::from_str(text)?;
        entries
            .into_iter()
            .map(|(name, columns)| -> Result<TableSchema> {
                let columns: Vec<Column> = serde_json::from_value(columns)?;
                Ok(TableSchema { name, columns })
            })
            .collect()
    }

    fn encode_schema(schema: &[TableSchema]) -> Result<String> {
        let mut entries = Map::new();
        for entry in schema {
            entries.insert(entry.name.clone(), serde_json::to_value(&entry.columns)?);
        }
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

/// Tables stored as JSON files in one directory
pub type JsonFileTables = FileTables<JsonFormat>;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonsql_core::{ColumnType, Error, Table, TablesSnapshot};
    use serde_json::json;
    use tempfile::tempdir;

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    fn open_with_users() -> (tempfile::TempDir, JsonFileTables) {
        let dir = tempdir().unwrap();
        let mut tables = JsonFileTables::open(dir.path()).unwrap();
        let users = Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int).primary_key(),
                Column::new("name", ColumnType::String),
            ],
        )
        .with_rows(rows(json!([
            {"id": 1, "name": "Alice"},
            {"id": 2, "name": "Bob"},
        ])));
        tables.add_table(users).unwrap();
        (dir, tables)
    }

    #[test]
    fn test_file_layout() {
        let (dir, _tables) = open_with_users();

        let data: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("users.json")).unwrap())
                .unwrap();
        assert_eq!(data, json!([{"id": 1, "name": "Alice"}, {"id": 2, "name": "Bob"}]));

        let schema: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("metadata.json")).unwrap(),
        )
        .unwrap();
        let columns = schema["users"].as_array().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0]["name"], json!("id"));
        assert_eq!(columns[0]["type"], json!("int"));
        assert_eq!(columns[0]["is_primary_key"], json!(true));
        assert!(columns[0]["id"].is_string());
    }

    #[test]
    fn test_round_trip_keeps_column_ids() {
        let (dir, tables) = open_with_users();
        let first = tables.get_table("users").unwrap().unwrap();

        let reopened = JsonFileTables::open(dir.path()).unwrap();
        let second = reopened.get_table("users").unwrap().unwrap();

        assert_eq!(first.columns[0].column_id, second.columns[0].column_id);
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn test_delete_keeps_second_row() {
        let (_dir, mut tables) = open_with_users();
        tables.delete("users", &[0]).unwrap();
        let table = tables.get_table("users").unwrap().unwrap();
        assert_eq!(table.data, rows(json!([{"id": 2, "name": "Bob"}])));
    }

    #[test]
    fn test_rename_column_rewrites_rows() {
        let (_dir, mut tables) = open_with_users();
        tables.rename_column("users", "name", "label").unwrap();

        let table = tables.get_table("users").unwrap().unwrap();
        let keys: Vec<_> = table.data[0].keys().cloned().collect();
        assert_eq!(keys, vec!["id", "label"]);
        assert!(table.column("label").is_some());
    }

    #[test]
    fn test_duplicates_and_unknowns() {
        let (_dir, mut tables) = open_with_users();

        assert!(matches!(
            tables.add_table(Table::new("users", vec![])),
            Err(Error::DuplicateTable(_))
        ));
        assert!(matches!(
            tables.add_column("users", Column::new("name", ColumnType::String)),
            Err(Error::DuplicateColumn { .. })
        ));
        assert!(matches!(
            tables.insert("nobody", Row::new()),
            Err(Error::UnknownTable(_))
        ));
        assert!(matches!(
            tables.update("users", 2, Row::new()),
            Err(Error::IndexOutOfRange { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn test_empty_data_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("metadata.json"), r#"{"t": []}"#).unwrap();
        std::fs::write(dir.path().join("t.json"), "  \n").unwrap();

        let tables = JsonFileTables::open(dir.path()).unwrap();
        let table = tables.get_table("t").unwrap().unwrap();
        assert!(table.data.is_empty());
    }
}
