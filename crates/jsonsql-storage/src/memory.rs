//! In-memory tables.
//!
//! Rows are held keyed by column id and converted back to names on read,
//! so renaming a column never touches row data.

use jsonsql_core::{Column, ColumnType, Error, Result, Row, Table, TablesSnapshot};
use tracing::info;

use crate::rows::{check_index, delete_rows, merge_changes};

/// Tables held purely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryTables {
    tables: Vec<Table>,
}

impl InMemoryTables {
    /// Create an empty set of tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from existing tables with name-keyed rows
    pub fn with_tables(tables: Vec<Table>) -> Result<Self> {
        let mut store = Self::new();
        for table in tables {
            store.add_table(table)?;
        }
        Ok(store)
    }

    /// True if a table with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))
    }

    fn column_id(table: &Table, column_name: &str) -> Result<String> {
        table
            .column(column_name)
            .map(|c| c.column_id.clone())
            .ok_or_else(|| Error::UnknownColumn {
                table: table.name.clone(),
                column: column_name.to_string(),
            })
    }
}

impl TablesSnapshot for InMemoryTables {
    fn get_table(&self, name: &str) -> Result<Option<Table>> {
        Ok(self.tables.iter().find(|t| t.name == name).map(|stored| {
            let mut table = stored.clone();
            table.data = stored
                .data
                .iter()
                .map(|row| stored.row_from_column_ids(row))
                .collect();
            table
        }))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn add_table(&mut self, mut table: Table) -> Result<()> {
        if self.contains(&table.name) {
            return Err(Error::DuplicateTable(table.name));
        }
        table.data = table
            .data
            .iter()
            .map(|row| table.row_to_column_ids(row))
            .collect();
        info!(table = %table.name, rows = table.data.len(), "created in-memory table");
        self.tables.push(table);
        Ok(())
    }

    fn remove_table(&mut self, name: &str) -> Result<()> {
        let position = self
            .tables
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTable(name.to_string()))?;
        self.tables.remove(position);
        info!(table = %name, "removed in-memory table");
        Ok(())
    }

    fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if old_name != new_name && self.contains(new_name) {
            return Err(Error::DuplicateTable(new_name.to_string()));
        }
        self.table_mut(old_name)?.name = new_name.to_string();
        info!(from = %old_name, to = %new_name, "renamed in-memory table");
        Ok(())
    }

    fn add_column(&mut self, table_name: &str, column: Column) -> Result<()> {
        let table = self.table_mut(table_name)?;
        if table.column(&column.name).is_some() {
            return Err(Error::DuplicateColumn {
                table: table_name.to_string(),
                column: column.name,
            });
        }
        let default = column.default_value();
        for row in &mut table.data {
            row.insert(column.column_id.clone(), default.clone());
        }
        table.columns.push(column);
        Ok(())
    }

    fn remove_column(&mut self, table_name: &str, column_name: &str) -> Result<()> {
        let table = self.table_mut(table_name)?;
        let column_id = Self::column_id(table, column_name)?;
        for row in &mut table.data {
            jsonsql_core::tables::remove_key(row, &column_id);
        }
        table.columns.retain(|c| c.column_id != column_id);
        Ok(())
    }

    fn rename_column(&mut self, table_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        let table = self.table_mut(table_name)?;
        Self::column_id(table, old_name)?;
        if old_name != new_name && table.column(new_name).is_some() {
            return Err(Error::DuplicateColumn {
                table: table_name.to_string(),
                column: new_name.to_string(),
            });
        }
        if let Some(column) = table.column_mut(old_name) {
            column.name = new_name.to_string();
        }
        Ok(())
    }

    fn change_column_type(
        &mut self,
        table_name: &str,
        column_name: &str,
        new_type: ColumnType,
    ) -> Result<()> {
        let table = self.table_mut(table_name)?;
        match table.column_mut(column_name) {
            Some(column) => {
                column.column_type = new_type;
                Ok(())
            }
            None => Err(Error::UnknownColumn {
                table: table_name.to_string(),
                column: column_name.to_string(),
            }),
        }
    }

    fn insert(&mut self, table_name: &str, mut row: Row) -> Result<()> {
        let table = self.table_mut(table_name)?;
        table.fill_defaults(&mut row);
        let stored = table.row_to_column_ids(&row);
        table.data.push(stored);
        Ok(())
    }

    fn update(&mut self, table_name: &str, index: usize, changes: Row) -> Result<()> {
        let table = self.table_mut(table_name)?;
        check_index(table_name, index, table.data.len())?;
        let changes = table.row_to_column_ids(&changes);
        merge_changes(&mut table.data[index], changes);
        Ok(())
    }

    fn delete(&mut self, table_name: &str, indices: &[usize]) -> Result<()> {
        let table = self.table_mut(table_name)?;
        delete_rows(table_name, &mut table.data, indices)
    }
}
