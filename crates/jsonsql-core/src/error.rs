//! Error types for jsonsql.

use std::path::PathBuf;

use thiserror::Error;

use crate::query::lexer::LexerError;
use crate::query::parser::ParseError;

/// The main error type for jsonsql operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Query text could not be tokenized
    #[error("Lexical error: {0}")]
    Lexer(#[from] LexerError),

    /// Token stream did not form a valid statement
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Referenced table does not exist
    #[error("Table not found: {0}")]
    UnknownTable(String),

    /// Referenced column does not exist in the table
    #[error("Column not found: {table}.{column}")]
    UnknownColumn {
        /// Table that was searched
        table: String,
        /// Missing column name
        column: String,
    },

    /// Name not bound in the evaluation scope
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Table name cannot be stored in the table directory
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    /// A table with this name already exists
    #[error("Table already exists: {0}")]
    DuplicateTable(String),

    /// A column with this name already exists in the table
    #[error("Column already exists: {table}.{column}")]
    DuplicateColumn {
        /// Table holding the column
        table: String,
        /// Conflicting column name
        column: String,
    },

    /// Operand or result of the wrong type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Division with a zero divisor
    #[error("Division by zero")]
    DivisionByZero,

    /// Function name not recognised as aggregate or scalar
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    /// Row index outside the table's current rows
    #[error("Row index {index} out of range for table {table} with {len} rows")]
    IndexOutOfRange {
        /// Table being mutated
        table: String,
        /// Offending index
        index: usize,
        /// Row count at call time
        len: usize,
    },

    /// Backing file is missing
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for jsonsql operations.
pub type Result<T> = std::result::Result<T, Error>;
