//! # jsonsql
//!
//! An embedded SQL-like query engine over tables kept in JSON files,
//! JSON-Lines files, or memory.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jsonsql::{Column, ColumnType, Database, Table, TablesSnapshot};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Tables live in ./data as users.json plus metadata.json
//!     let mut db = Database::open_json("./data")?;
//!
//!     db.tables_mut().add_table(Table::new(
//!         "users",
//!         vec![
//!             Column::new("id", ColumnType::Int).primary_key(),
//!             Column::new("name", ColumnType::String),
//!         ],
//!     ))?;
//!     db.tables_mut()
//!         .insert("users", serde_json::from_value(json!({"id": 1, "name": "Alice"}))?)?;
//!
//!     for row in db.query("SELECT upper(name) AS name FROM users WHERE id = 1")? {
//!         println!("{}", serde_json::Value::Object(row));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! ```rust,no_run
//! use jsonsql::Database;
//!
//! // One JSON array per table
//! let json_db = Database::open_json("./data")?;
//!
//! // One JSON-Lines stream per table
//! let jsonl_db = Database::open_jsonl("./stream")?;
//!
//! // Nothing touches disk
//! let memory_db = Database::in_memory()?;
//! # Ok::<(), jsonsql::Error>(())
//! ```
//!
//! ## Query surface
//!
//! `SELECT` with `FROM`, joins, `WHERE`, `GROUP BY`, `ORDER BY` and
//! `LIMIT`/`OFFSET`; aggregates `count`, `sum`, `avg`, `min`, `max`,
//! `every`, `bool_and`, `bool_or`, `bit_and`, `bit_or`, `array_agg`,
//! `string_agg`; scalars `lower` and `upper`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

// Re-export core types
pub use jsonsql_core::query::{self, eval_sql, Select};
pub use jsonsql_core::{Column, ColumnType, Error, ForeignKey, Result, Row, Table, TablesSnapshot};

// Storage backends
pub use jsonsql_storage::{
    ExtendedTables, FileTables, InMemoryTables, JsonFileTables, JsonLinesTables, TableSchema,
};

pub mod logging;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where a database keeps its tables
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Backend {
    /// In memory only
    #[default]
    Memory,
    /// `<table>.json` files plus `metadata.json` in a directory
    Json(PathBuf),
    /// `<table>.jsonl` files plus `metadata.jsonl` in a directory
    JsonLines(PathBuf),
}

/// Database configuration
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Table backend
    pub backend: Backend,
    /// Variables visible to every query, shadowed by row fields
    pub context: Row,
}

impl DatabaseConfig {
    /// In-memory tables, empty context
    pub fn memory() -> Self {
        Self::default()
    }

    /// JSON files under `dir`
    pub fn json<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            backend: Backend::Json(dir.into()),
            ..Default::default()
        }
    }

    /// JSON-Lines files under `dir`
    pub fn json_lines<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            backend: Backend::JsonLines(dir.into()),
            ..Default::default()
        }
    }

    /// Replace the query context
    pub fn with_context(mut self, context: Row) -> Self {
        self.context = context;
        self
    }

    /// Bind one context variable
    pub fn with_variable<S: Into<String>>(mut self, name: S, value: Value) -> Self {
        self.context.insert(name.into(), value);
        self
    }
}

/// Storage backend for the database
enum StorageBackend {
    /// Tables held in memory
    Memory(InMemoryTables),
    /// JSON files
    Json(JsonFileTables),
    /// JSON-Lines files
    JsonLines(JsonLinesTables),
    /// Another backend with extra in-memory tables on top
    Overlay(Box<ExtendedTables<StorageBackend>>),
}

impl StorageBackend {
    fn open(backend: &Backend) -> Result<Self> {
        Ok(match backend {
            Backend::Memory => StorageBackend::Memory(InMemoryTables::new()),
            Backend::Json(dir) => StorageBackend::Json(JsonFileTables::open(dir)?),
            Backend::JsonLines(dir) => StorageBackend::JsonLines(JsonLinesTables::open(dir)?),
        })
    }

    fn as_snapshot(&self) -> &dyn TablesSnapshot {
        match self {
            StorageBackend::Memory(tables) => tables,
            StorageBackend::Json(tables) => tables,
            StorageBackend::JsonLines(tables) => tables,
            StorageBackend::Overlay(tables) => &**tables,
        }
    }

    fn as_snapshot_mut(&mut self) -> &mut dyn TablesSnapshot {
        match self {
            StorageBackend::Memory(tables) => tables,
            StorageBackend::Json(tables) => tables,
            StorageBackend::JsonLines(tables) => tables,
            StorageBackend::Overlay(tables) => &mut **tables,
        }
    }

    fn is_persistent(&self) -> bool {
        match self {
            StorageBackend::Memory(_) => false,
            StorageBackend::Json(_) | StorageBackend::JsonLines(_) => true,
            StorageBackend::Overlay(tables) => tables.inner().is_persistent(),
        }
    }
}

impl TablesSnapshot for StorageBackend {
    fn get_table(&self, name: &str) -> Result<Option<Table>> {
        self.as_snapshot().get_table(name)
    }

    fn table_names(&self) -> Result<Vec<String>> {
        self.as_snapshot().table_names()
    }

    fn add_table(&mut self, table: Table) -> Result<()> {
        self.as_snapshot_mut().add_table(table)
    }

    fn remove_table(&mut self, name: &str) -> Result<()> {
        self.as_snapshot_mut().remove_table(name)
    }

    fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.as_snapshot_mut().rename_table(old_name, new_name)
    }

    fn add_column(&mut self, table_name: &str, column: Column) -> Result<()> {
        self.as_snapshot_mut().add_column(table_name, column)
    }

    fn remove_column(&mut self, table_name: &str, column_name: &str) -> Result<()> {
        self.as_snapshot_mut().remove_column(table_name, column_name)
    }

    fn rename_column(&mut self, table_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        self.as_snapshot_mut()
            .rename_column(table_name, old_name, new_name)
    }

    fn change_column_type(
        &mut self,
        table_name: &str,
        column_name: &str,
        new_type: ColumnType,
    ) -> Result<()> {
        self.as_snapshot_mut()
            .change_column_type(table_name, column_name, new_type)
    }

    fn insert(&mut self, table_name: &str, row: Row) -> Result<()> {
        self.as_snapshot_mut().insert(table_name, row)
    }

    fn update(&mut self, table_name: &str, index: usize, changes: Row) -> Result<()> {
        self.as_snapshot_mut().update(table_name, index, changes)
    }

    fn delete(&mut self, table_name: &str, indices: &[usize]) -> Result<()> {
        self.as_snapshot_mut().delete(table_name, indices)
    }
}

/// The main database handle.
///
/// Owns one table backend and a base query context. Queries are read-only;
/// schema and row changes go through [`Database::tables_mut`].
///
/// # Examples
///
/// ```rust
/// use jsonsql::Database;
/// use serde_json::json;
///
/// let db = Database::in_memory()?;
/// let rows = db.query("SELECT 1 + 1 AS two")?;
/// assert_eq!(rows[0]["two"], json!(2));
/// # Ok::<(), jsonsql::Error>(())
/// ```
pub struct Database {
    backend: StorageBackend,
    context: Row,
}

impl Database {
    /// Opens tables stored as JSON files under `dir`.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn open_json<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_config(DatabaseConfig::json(dir.as_ref()))
    }

    /// Opens tables stored as JSON-Lines files under `dir`.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn open_jsonl<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_config(DatabaseConfig::json_lines(dir.as_ref()))
    }

    /// Opens a database from a full configuration.
    pub fn open_with_config(config: DatabaseConfig) -> Result<Self> {
        let backend = StorageBackend::open(&config.backend)?;
        debug!(backend = ?config.backend, "opened database");
        Ok(Database {
            backend,
            context: config.context,
        })
    }

    /// Creates an empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::open_with_config(DatabaseConfig::memory())
    }

    /// Creates an in-memory database holding `tables`.
    pub fn with_tables(tables: Vec<Table>) -> Result<Self> {
        Ok(Database {
            backend: StorageBackend::Memory(InMemoryTables::with_tables(tables)?),
            context: Row::new(),
        })
    }

    /// Layers `extra` in-memory tables over the current backend.
    ///
    /// Reads look in the current backend first; changes to an extra table
    /// stay in memory. New tables are still created in the current backend.
    pub fn with_overlay(self, extra: Vec<Table>) -> Result<Self> {
        let overlay = ExtendedTables::new(self.backend, extra)?;
        Ok(Database {
            backend: StorageBackend::Overlay(Box::new(overlay)),
            context: self.context,
        })
    }

    /// Runs a query with the database's base context.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.run(sql, &self.context)
    }

    /// Runs a query with `context` layered over the base context; on a
    /// name clash the per-call value wins.
    pub fn query_with_context(&self, sql: &str, context: &Row) -> Result<Vec<Row>> {
        let mut merged = self.context.clone();
        merged.extend(context.clone());
        self.run(sql, &merged)
    }

    fn run(&self, sql: &str, context: &Row) -> Result<Vec<Row>> {
        let rows = eval_sql(sql, self.backend.as_snapshot(), context)?;
        debug!(sql, rows = rows.len(), "query finished");
        Ok(rows)
    }

    /// Parses a query without running it.
    pub fn prepare(&self, sql: &str) -> Result<Select> {
        query::parse(sql)
    }

    /// Runs a previously prepared query with the base context.
    pub fn execute(&self, select: &Select) -> Result<Vec<Row>> {
        query::execute(select, self.backend.as_snapshot(), &self.context)
    }

    /// The base query context
    pub fn context(&self) -> &Row {
        &self.context
    }

    /// Replace the base query context
    pub fn set_context(&mut self, context: Row) {
        self.context = context;
    }

    /// Read access to the table store
    pub fn tables(&self) -> &dyn TablesSnapshot {
        self.backend.as_snapshot()
    }

    /// Schema and row changes
    pub fn tables_mut(&mut self) -> &mut dyn TablesSnapshot {
        self.backend.as_snapshot_mut()
    }

    /// Returns whether tables are backed by files.
    pub fn is_persistent(&self) -> bool {
        self.backend.is_persistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.3.0");
    }

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        assert!(!db.is_persistent());
        assert_eq!(db.query("SELECT 1+1").unwrap(), vec![row(json!({"?column?": 2}))]);
    }

    #[test]
    fn test_json_database_is_persistent() {
        let dir = tempdir().unwrap();
        let db = Database::open_json(dir.path()).unwrap();
        assert!(db.is_persistent());

        let db = db.with_overlay(vec![]).unwrap();
        assert!(db.is_persistent());
    }

    #[test]
    fn test_context_layering() {
        let config = DatabaseConfig::memory()
            .with_variable("a", json!(1))
            .with_variable("b", json!(2));
        let db = Database::open_with_config(config).unwrap();

        assert_eq!(db.query("SELECT a + b AS s").unwrap()[0]["s"], json!(3));

        let rows = db
            .query_with_context("SELECT a + b AS s", &row(json!({"b": 40})))
            .unwrap();
        assert_eq!(rows[0]["s"], json!(41));
    }

    #[test]
    fn test_prepare_and_execute() {
        let db = Database::with_tables(vec![Table::new(
            "t",
            vec![Column::new("x", ColumnType::Int)],
        )
        .with_rows(vec![row(json!({"x": 1})), row(json!({"x": 2}))])])
        .unwrap();

        let select = db.prepare("SELECT x FROM t WHERE x > 1").unwrap();
        assert_eq!(db.execute(&select).unwrap(), vec![row(json!({"x": 2}))]);
    }

    #[test]
    fn test_prepare_reports_parse_errors() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(db.prepare("SELECT FROM"), Err(Error::Parse(_))));
        assert!(matches!(db.prepare("SELECT #"), Err(Error::Lexer(_))));
    }
}
