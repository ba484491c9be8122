//! Directory-backed tables.
//!
//! One data file per table plus a shared schema file. Every mutation is a
//! whole-file read, modify and write, and each write replaces its target
//! atomically through a sibling temporary file.

use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use jsonsql_core::tables::{remove_key, rename_key};
use jsonsql_core::{Column, ColumnType, Error, Result, Row, Table, TablesSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::rows::{check_index, delete_rows, infer_columns, merge_changes};

/// Schema entry for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    #[serde(rename = "table_name")]
    pub name: String,
    /// Column definitions in order
    pub columns: Vec<Column>,
}

/// On-disk encoding of row and schema files
pub trait FileFormat {
    /// Extension of per-table data files, including the dot
    const DATA_EXTENSION: &'static str;
    /// File name of the shared schema file
    const SCHEMA_FILE: &'static str;

    /// Decode a data file. Whitespace-only input is an empty table.
    fn decode_rows(text: &str) -> Result<Vec<Row>>;
    /// Encode a data file
    fn encode_rows(rows: &[Row]) -> Result<String>;
    /// Decode the schema file. Whitespace-only input is an empty schema.
    fn decode_schema(text: &str) -> Result<Vec<TableSchema>>;
    /// Encode the schema file
    fn encode_schema(schema: &[TableSchema]) -> Result<String>;
}

/// Write `contents` to `path` by writing a sibling temporary file and
/// renaming it over the target.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents)?;
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(err.into());
    }

    debug!(path = %path.display(), bytes = contents.len(), "rewrote file");
    Ok(())
}

/// Read a whole file, mapping a missing file to `None`
fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            trace!(path = %path.display(), bytes = text.len(), "read file");
            Ok(Some(text))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Tables stored as files in one directory
#[derive(Debug, Clone)]
pub struct FileTables<F: FileFormat> {
    dir: PathBuf,
    _format: PhantomData<F>,
}

impl<F: FileFormat> FileTables<F> {
    /// Use `dir` as the table directory, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _format: PhantomData,
        })
    }

    /// The table directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the data file for `table_name`. Names that would leave the
    /// directory or land on the schema file are rejected.
    pub fn data_path(&self, table_name: &str) -> Result<PathBuf> {
        check_table_name::<F>(table_name)?;
        Ok(self.dir.join(format!("{}{}", table_name, F::DATA_EXTENSION)))
    }

    /// Path of the schema file
    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(F::SCHEMA_FILE)
    }

    /// Load the schema; a missing file is an empty schema
    pub fn read_schema(&self) -> Result<Vec<TableSchema>> {
        match read_optional(&self.schema_path())? {
            Some(text) => F::decode_schema(&text),
            None => Ok(Vec::new()),
        }
    }

    fn write_schema(&self, schema: &[TableSchema]) -> Result<()> {
        write_atomic(&self.schema_path(), &F::encode_schema(schema)?)
    }

    fn read_rows(&self, table_name: &str) -> Result<Vec<Row>> {
        let path = self.data_path(table_name)?;
        match read_optional(&path)? {
            Some(text) => F::decode_rows(&text),
            None => Err(Error::NotFound(path)),
        }
    }

    fn write_rows(&self, table_name: &str, rows: &[Row]) -> Result<()> {
        write_atomic(&self.data_path(table_name)?, &F::encode_rows(rows)?)
    }

    fn data_exists(&self, table_name: &str) -> Result<bool> {
        Ok(self.data_path(table_name)?.is_file())
    }

    fn exists(&self, schema: &[TableSchema], table_name: &str) -> Result<bool> {
        Ok(schema.iter().any(|s| s.name == table_name) || self.data_exists(table_name)?)
    }

    /// Position of the schema entry for `table_name`. A table that only
    /// has a data file gets an inferred entry appended.
    fn entry_position(&self, schema: &mut Vec<TableSchema>, table_name: &str) -> Result<usize> {
        if let Some(position) = schema.iter().position(|s| s.name == table_name) {
            return Ok(position);
        }
        if !self.data_exists(table_name)? {
            return Err(Error::UnknownTable(table_name.to_string()));
        }
        let rows = self.read_rows(table_name)?;
        schema.push(TableSchema {
            name: table_name.to_string(),
            columns: infer_columns(&rows),
        });
        Ok(schema.len() - 1)
    }

    /// Apply `change` to the columns and rows of one table, then write both
    /// files back.
    fn modify_table<T>(
        &self,
        table_name: &str,
        change: impl FnOnce(&mut Vec<Column>, &mut Vec<Row>) -> Result<T>,
    ) -> Result<T> {
        let mut schema = self.read_schema()?;
        let position = self.entry_position(&mut schema, table_name)?;
        let mut rows = self.read_rows(table_name)?;

        let result = change(&mut schema[position].columns, &mut rows)?;

        self.write_rows(table_name, &rows)?;
        self.write_schema(&schema)?;
        Ok(result)
    }

    /// Apply `change` to the rows of one table and write them back
    fn modify_rows(
        &self,
        table_name: &str,
        change: impl FnOnce(&[Column], &mut Vec<Row>) -> Result<()>,
    ) -> Result<()> {
        let mut schema = self.read_schema()?;
        let position = self.entry_position(&mut schema, table_name)?;
        let mut rows = self.read_rows(table_name)?;

        change(&schema[position].columns, &mut rows)?;

        self.write_rows(table_name, &rows)
    }
}

fn check_table_name<F: FileFormat>(name: &str) -> Result<()> {
    let schema_stem = F::SCHEMA_FILE
        .strip_suffix(F::DATA_EXTENSION)
        .unwrap_or(F::SCHEMA_FILE);
    let invalid = name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
        || name == schema_stem;
    if invalid {
        return Err(Error::InvalidTableName(name.to_string()));
    }
    Ok(())
}

fn unknown_column(table_name: &str, column_name: &str) -> Error {
    Error::UnknownColumn {
        table: table_name.to_string(),
        column: column_name.to_string(),
    }
}

impl<F: FileFormat> TablesSnapshot for FileTables<F> {
    fn get_table(&self, name: &str) -> Result<Option<Table>> {
        let schema = self.read_schema()?;
        match schema.into_iter().find(|s| s.name == name) {
            Some(entry) => {
                let rows = self.read_rows(name)?;
                Ok(Some(Table::new(entry.name, entry.columns).with_rows(rows)))
            }
            None if self.data_exists(name)? => {
                let rows = self.read_rows(name)?;
                Ok(Some(Table::new(name, infer_columns(&rows)).with_rows(rows)))
            }
            None => Ok(None),
        }
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.read_schema()?.into_iter().map(|s| s.name).collect();

        let mut unlisted = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.file_name().and_then(|n| n.to_str()) == Some(F::SCHEMA_FILE) {
                continue;
            }
            let stem = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(F::DATA_EXTENSION));
            if let Some(stem) = stem {
                if !names.iter().any(|n| n == stem) {
                    unlisted.push(stem.to_string());
                }
            }
        }
        unlisted.sort();
        names.extend(unlisted);
        Ok(names)
    }

    fn add_table(&mut self, table: Table) -> Result<()> {
        let mut schema = self.read_schema()?;
        if self.exists(&schema, &table.name)? {
            return Err(Error::DuplicateTable(table.name));
        }

        self.write_rows(&table.name, &table.data)?;
        schema.push(TableSchema {
            name: table.name.clone(),
            columns: table.columns,
        });
        self.write_schema(&schema)?;

        info!(table = %table.name, rows = table.data.len(), dir = %self.dir.display(), "created table");
        Ok(())
    }

    fn remove_table(&mut self, name: &str) -> Result<()> {
        let mut schema = self.read_schema()?;
        if !self.exists(&schema, name)? {
            return Err(Error::UnknownTable(name.to_string()));
        }

        match fs::remove_file(self.data_path(name)?) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        let before = schema.len();
        schema.retain(|s| s.name != name);
        if schema.len() != before {
            self.write_schema(&schema)?;
        }

        info!(table = %name, "removed table");
        Ok(())
    }

    fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let mut schema = self.read_schema()?;
        if !self.exists(&schema, old_name)? {
            return Err(Error::UnknownTable(old_name.to_string()));
        }
        if old_name == new_name {
            return Ok(());
        }
        if self.exists(&schema, new_name)? {
            return Err(Error::DuplicateTable(new_name.to_string()));
        }

        if self.data_exists(old_name)? {
            fs::rename(self.data_path(old_name)?, self.data_path(new_name)?)?;
        }
        if let Some(entry) = schema.iter_mut().find(|s| s.name == old_name) {
            entry.name = new_name.to_string();
            self.write_schema(&schema)?;
        }

        info!(from = %old_name, to = %new_name, "renamed table");
        Ok(())
    }

    fn add_column(&mut self, table_name: &str, column: Column) -> Result<()> {
        self.modify_table(table_name, |columns, rows| {
            if columns.iter().any(|c| c.name == column.name) {
                return Err(Error::DuplicateColumn {
                    table: table_name.to_string(),
                    column: column.name,
                });
            }
            let default = column.default_value();
            for row in rows.iter_mut() {
                row.insert(column.name.clone(), default.clone());
            }
            columns.push(column);
            Ok(())
        })
    }

    fn remove_column(&mut self, table_name: &str, column_name: &str) -> Result<()> {
        self.modify_table(table_name, |columns, rows| {
            let position = columns
                .iter()
                .position(|c| c.name == column_name)
                .ok_or_else(|| unknown_column(table_name, column_name))?;
            columns.remove(position);
            for row in rows.iter_mut() {
                remove_key(row, column_name);
            }
            Ok(())
        })
    }

    fn rename_column(&mut self, table_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        self.modify_table(table_name, |columns, rows| {
            if !columns.iter().any(|c| c.name == old_name) {
                return Err(unknown_column(table_name, old_name));
            }
            if old_name == new_name {
                return Ok(());
            }
            if columns.iter().any(|c| c.name == new_name) {
                return Err(Error::DuplicateColumn {
                    table: table_name.to_string(),
                    column: new_name.to_string(),
                });
            }
            for column in columns.iter_mut().filter(|c| c.name == old_name) {
                column.name = new_name.to_string();
            }
            for row in rows.iter_mut() {
                rename_key(row, old_name, new_name);
            }
            Ok(())
        })
    }

    fn change_column_type(
        &mut self,
        table_name: &str,
        column_name: &str,
        new_type: ColumnType,
    ) -> Result<()> {
        let mut schema = self.read_schema()?;
        let position = self.entry_position(&mut schema, table_name)?;
        let column = schema[position]
            .columns
            .iter_mut()
            .find(|c| c.name == column_name)
            .ok_or_else(|| unknown_column(table_name, column_name))?;
        column.column_type = new_type;
        self.write_schema(&schema)
    }

    fn insert(&mut self, table_name: &str, mut row: Row) -> Result<()> {
        self.modify_rows(table_name, |columns, rows| {
            for column in columns {
                if !row.contains_key(&column.name) {
                    row.insert(column.name.clone(), column.default_value());
                }
            }
            rows.push(row);
            Ok(())
        })
    }

    fn update(&mut self, table_name: &str, index: usize, changes: Row) -> Result<()> {
        self.modify_rows(table_name, |_, rows| {
            check_index(table_name, index, rows.len())?;
            merge_changes(&mut rows[index], changes);
            Ok(())
        })
    }

    fn delete(&mut self, table_name: &str, indices: &[usize]) -> Result<()> {
        self.modify_rows(table_name, |_, rows| delete_rows(table_name, rows, indices))
    }
}
