//! A snapshot layered over another with extra in-memory tables.
//!
//! Reads consult the underlying snapshot first and fall back to the
//! overlay. Mutations of an existing table go to the overlay when it holds
//! that table, otherwise to the underlying snapshot. New tables are always
//! created in the underlying snapshot.

use jsonsql_core::{Column, ColumnType, Result, Row, Table, TablesSnapshot};

use crate::memory::InMemoryTables;

/// Underlying snapshot plus an in-memory overlay
#[derive(Debug, Clone)]
pub struct ExtendedTables<S> {
    snapshot: S,
    overlay: InMemoryTables,
}

impl<S: TablesSnapshot> ExtendedTables<S> {
    /// Layer `extra_tables` over `snapshot`
    pub fn new(snapshot: S, extra_tables: Vec<Table>) -> Result<Self> {
        Ok(Self {
            snapshot,
            overlay: InMemoryTables::with_tables(extra_tables)?,
        })
    }

    /// The underlying snapshot
    pub fn inner(&self) -> &S {
        &self.snapshot
    }

    /// The in-memory overlay
    pub fn overlay(&self) -> &InMemoryTables {
        &self.overlay
    }

    /// Drop the overlay and return the underlying snapshot
    pub fn into_inner(self) -> S {
        self.snapshot
    }

    fn target(&mut self, table_name: &str) -> &mut dyn TablesSnapshot {
        if self.overlay.contains(table_name) {
            &mut self.overlay
        } else {
            &mut self.snapshot
        }
    }
}

impl<S: TablesSnapshot> TablesSnapshot for ExtendedTables<S> {
    fn get_table(&self, name: &str) -> Result<Option<Table>> {
        match self.snapshot.get_table(name)? {
            Some(table) => Ok(Some(table)),
            None => self.overlay.get_table(name),
        }
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut names = self.snapshot.table_names()?;
        for name in self.overlay.table_names()? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn add_table(&mut self, table: Table) -> Result<()> {
        self.snapshot.add_table(table)
    }

    fn remove_table(&mut self, name: &str) -> Result<()> {
        self.target(name).remove_table(name)
    }

    fn rename_table(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        self.target(old_name).rename_table(old_name, new_name)
    }

    fn add_column(&mut self, table_name: &str, column: Column) -> Result<()> {
        self.target(table_name).add_column(table_name, column)
    }

    fn remove_column(&mut self, table_name: &str, column_name: &str) -> Result<()> {
        self.target(table_name).remove_column(table_name, column_name)
    }

    fn rename_column(&mut self, table_name: &str, old_name: &str, new_name: &str) -> Result<()> {
        self.target(table_name)
            .rename_column(table_name, old_name, new_name)
    }

    fn change_column_type(
        &mut self,
        table_name: &str,
        column_name: &str,
        new_type: ColumnType,
    ) -> Result<()> {
        self.target(table_name)
            .change_column_type(table_name, column_name, new_type)
    }

    fn insert(&mut self, table_name: &str, row: Row) -> Result<()> {
        self.target(table_name).insert(table_name, row)
    }

    fn update(&mut self, table_name: &str, index: usize, changes: Row) -> Result<()> {
        self.target(table_name).update(table_name, index, changes)
    }

    fn delete(&mut self, table_name: &str, indices: &[usize]) -> Result<()> {
        self.target(table_name).delete(table_name, indices)
    }
}
