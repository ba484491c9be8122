//! # jsonsql Core
//!
//! Core types for the jsonsql query engine: the error taxonomy, the table
//! schema model with its `TablesSnapshot` storage contract, and the query
//! pipeline (lexer, parser, evaluator, executor).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod query;
pub mod tables;

pub use error::{Error, Result};
pub use tables::{Column, ColumnType, ForeignKey, Row, Table, TablesSnapshot};
