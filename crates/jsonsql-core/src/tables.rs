//! Table schema model and the storage contract shared by every backend.
//!
//! Rows are plain JSON objects keyed by column name. Columns additionally
//! carry a stable id, assigned once at creation, so a backend may key its
//! internal storage by id and survive renames without rewriting data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// A single table row: column name to value, in insertion order.
pub type Row = serde_json::Map<String, Value>;

/// Lightweight type tag attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Integer numbers
    Int,
    /// UTF-8 strings
    String,
    /// Floating point numbers
    Float,
    /// Booleans
    Bool,
    /// Only ever null
    Null,
    /// Anything else (arrays, objects) or not yet known
    Unknown,
}

impl ColumnType {
    /// Classify a runtime value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(_) => ColumnType::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Int,
            Value::Number(_) => ColumnType::Float,
            Value::String(_) => ColumnType::String,
            Value::Null => ColumnType::Null,
            Value::Array(_) | Value::Object(_) => ColumnType::Unknown,
        }
    }

    /// The lowercase tag used in schema files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int",
            ColumnType::String => "string",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Null => "null",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a column to a column of another table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table
    pub table: String,
    /// Referenced column
    pub column: String,
}

impl ForeignKey {
    /// Create a new foreign key reference
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

fn generate_column_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Column definition.
///
/// Equality compares name, type, primary-key flag and foreign key only; the
/// id and default are not part of a column's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Stable id, never changes after creation
    #[serde(rename = "id", default = "generate_column_id")]
    pub column_id: String,
    /// Display name, may be renamed
    pub name: String,
    /// Type tag
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column is (part of) the primary key
    #[serde(default)]
    pub is_primary_key: bool,
    /// Value used for rows that do not provide one
    #[serde(default)]
    pub default: Option<Value>,
    /// Optional reference to another table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
}

impl Column {
    /// Create a column with a freshly generated id
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            column_id: generate_column_id(),
            name: name.into(),
            column_type,
            is_primary_key: false,
            default: None,
            foreign_key: None,
        }
    }

    /// Use an explicit id instead of a generated one
    pub fn with_id(mut self, column_id: impl Into<String>) -> Self {
        self.column_id = column_id.into();
        self
    }

    /// Mark the column as primary key
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the foreign key reference
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    /// The default value, or `null` when none is declared.
    pub fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.column_type == other.column_type
            && self.is_primary_key == other.is_primary_key
            && self.foreign_key == other.foreign_key
    }
}

/// A table: schema plus rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Ordered column definitions
    pub columns: Vec<Column>,
    /// Rows in storage order
    pub data: Vec<Row>,
    /// Id assigned at construction
    pub table_id: String,
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            data: Vec::new(),
            table_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Replace the table's rows
    pub fn with_rows(mut self, data: Vec<Row>) -> Self {
        self.data = data;
        self
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by name for mutation
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Look up a column by its stable id
    pub fn column_by_id(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.column_id == column_id)
    }

    /// Rekey a name-keyed row by column id. Unknown keys pass through.
    pub fn row_to_column_ids(&self, row: &Row) -> Row {
        row.iter()
            .map(|(key, value)| {
                let key = self
                    .column(key)
                    .map_or_else(|| key.clone(), |c| c.column_id.clone());
                (key, value.clone())
            })
            .collect()
    }

    /// Rekey an id-keyed row by column name. Unknown keys pass through.
    pub fn row_from_column_ids(&self, row: &Row) -> Row {
        row.iter()
            .map(|(key, value)| {
                let key = self
                    .column_by_id(key)
                    .map_or_else(|| key.clone(), |c| c.name.clone());
                (key, value.clone())
            })
            .collect()
    }

    /// Add declared columns missing from `row`, using their defaults.
    pub fn fill_defaults(&self, row: &mut Row) {
        for column in &self.columns {
            if !row.contains_key(&column.name) {
                row.insert(column.name.clone(), column.default_value());
            }
        }
    }
}

/// Rename a key in place, keeping its position.
pub fn rename_key(row: &mut Row, old: &str, new: &str) {
    if !row.contains_key(old) {
        return;
    }
    *row = std::mem::take(row)
        .into_iter()
        .map(|(k, v)| if k == old { (new.to_string(), v) } else { (k, v) })
        .collect();
}

/// Remove a key, keeping the order of the remaining keys.
pub fn remove_key(row: &mut Row, key: &str) {
    if !row.contains_key(key) {
        return;
    }
    *row = std::mem::take(row)
        .into_iter()
        .filter(|(k, _)| k != key)
        .collect();
}

/// Storage contract: schema and data CRUD over a set of named tables.
///
/// Rows cross this boundary keyed by column name. Row indices refer to the
/// table's ordering at call time; no stable row ids survive a delete.
pub trait TablesSnapshot {
    /// Fetch a table with its rows, or `None` if it does not exist
    fn get_table(&self, name: &str) -> Result<Option<Table>>;

    /// Names of all tables visible through this snapshot
    fn table_names(&self) -> Result<Vec<String>>;

    /// Create a table; fails if the name is taken
    fn add_table(&mut self, table: Table) -> Result<()>;

    /// Drop a table and its rows
    fn remove_table(&mut self, name: &str) -> Result<()>;

    /// Rename a table; fails if the new name is taken
    fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()>;

    /// Append a column, back-filling existing rows with its default
    fn add_column(&mut self, table_name: &str, column: Column) -> Result<()>;

    /// Drop a column and its values from every row
    fn remove_column(&mut self, table_name: &str, column_name: &str) -> Result<()>;

    /// Rename a column; existing rows see the new name
    fn rename_column(&mut self, table_name: &str, old_name: &str, new_name: &str) -> Result<()>;

    /// Change a column's type tag (values are not converted)
    fn change_column_type(
        &mut self,
        table_name: &str,
        column_name: &str,
        new_type: ColumnType,
    ) -> Result<()>;

    /// Append a row
    fn insert(&mut self, table_name: &str, row: Row) -> Result<()>;

    /// Merge `changes` into the row at `index`
    fn update(&mut self, table_name: &str, index: usize, changes: Row) -> Result<()>;

    /// Remove the rows at `indices`
    fn delete(&mut self, table_name: &str, indices: &[usize]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_column_type_from_value() {
        assert_eq!(ColumnType::from_value(&json!(true)), ColumnType::Bool);
        assert_eq!(ColumnType::from_value(&json!(1)), ColumnType::Int);
        assert_eq!(ColumnType::from_value(&json!(1.5)), ColumnType::Float);
        assert_eq!(ColumnType::from_value(&json!("a")), ColumnType::String);
        assert_eq!(ColumnType::from_value(&Value::Null), ColumnType::Null);
        assert_eq!(ColumnType::from_value(&json!([1])), ColumnType::Unknown);
    }

    #[test]
    fn test_column_ids_are_unique() {
        let a = Column::new("a", ColumnType::String);
        let b = Column::new("b", ColumnType::Int);
        assert_ne!(a.column_id, b.column_id);
    }

    #[test]
    fn test_column_equality_ignores_id() {
        let a = Column::new("a", ColumnType::Int);
        let b = Column::new("a", ColumnType::Int);
        assert_eq!(a, b);
        assert_ne!(a, Column::new("a", ColumnType::Int).primary_key());
    }

    #[test]
    fn test_column_serialization() {
        let column = Column::new("owner", ColumnType::Int)
            .with_id("c1")
            .with_foreign_key(ForeignKey::new("users", "id"));
        let encoded = serde_json::to_value(&column).unwrap();
        assert_eq!(
            encoded,
            json!({
                "id": "c1",
                "name": "owner",
                "type": "int",
                "is_primary_key": false,
                "default": null,
                "foreign_key": {"table": "users", "column": "id"}
            })
        );
    }

    #[test]
    fn test_legacy_column_without_id() {
        let column: Column =
            serde_json::from_value(json!({"name": "a", "type": "string"})).unwrap();
        assert!(!column.column_id.is_empty());
        assert!(!column.is_primary_key);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_row_id_conversion() {
        let table = Table::new(
            "users",
            vec![
                Column::new("id", ColumnType::Int).with_id("c1"),
                Column::new("name", ColumnType::String).with_id("c2"),
            ],
        );
        let by_name = row(json!({"id": 1, "name": "Alice", "extra": true}));
        let by_id = table.row_to_column_ids(&by_name);
        assert_eq!(by_id, row(json!({"c1": 1, "c2": "Alice", "extra": true})));
        assert_eq!(table.row_from_column_ids(&by_id), by_name);
    }

    #[test]
    fn test_rename_key_keeps_position() {
        let mut r = row(json!({"a": 1, "b": 2, "c": 3}));
        rename_key(&mut r, "b", "x");
        let keys: Vec<_> = r.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "x", "c"]);
        remove_key(&mut r, "a");
        let keys: Vec<_> = r.keys().cloned().collect();
        assert_eq!(keys, vec!["x", "c"]);
    }

    #[test]
    fn test_fill_defaults() {
        let table = Table::new(
            "t",
            vec![
                Column::new("a", ColumnType::Int),
                Column::new("active", ColumnType::Bool).with_default(json!(true)),
            ],
        );
        let mut r = row(json!({"a": 1}));
        table.fill_defaults(&mut r);
        assert_eq!(r, row(json!({"a": 1, "active": true})));
    }
}
