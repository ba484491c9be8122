//! # jsonsql Storage
//!
//! Table store backends for jsonsql.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of jsonsql.**
//!
//! Users should depend on the main `jsonsql` crate instead, which
//! re-exports everything needed here. This crate's API may change without
//! notice between minor versions.
//!
//! ---
//!
//! Every backend implements [`TablesSnapshot`](jsonsql_core::TablesSnapshot):
//!
//! - **[`InMemoryTables`]**: tables held in memory, rows keyed by column id
//! - **[`JsonFileTables`]**: `<table>.json` arrays plus `metadata.json`
//! - **[`JsonLinesTables`]**: `<table>.jsonl` streams plus `metadata.jsonl`
//! - **[`ExtendedTables`]**: any of the above with extra in-memory tables
//!   layered on top
//!
//! ## Layout
//!
//! ```text
//! data/
//! ├── metadata.json      {"users": [{"id", "name", "type", ...}], ...}
//! ├── users.json         [{"id": 1, "name": "Alice"}, ...]
//! └── orders.json
//! ```

pub mod extended;
pub mod file;
pub mod json;
pub mod jsonl;
pub mod memory;
mod rows;

pub use extended::ExtendedTables;
pub use file::{write_atomic, FileFormat, FileTables, TableSchema};
pub use json::{JsonFileTables, JsonFormat};
pub use jsonl::{JsonLinesFormat, JsonLinesTables};
pub use memory::InMemoryTables;
