//! Query engine module
//!
//! SQL-like query parsing, evaluation, and execution.

/// Abstract Syntax Tree types
#[allow(missing_docs)]
pub mod ast;
/// Expression and aggregate evaluation
pub mod eval;
/// Query executor
pub mod executor;
/// Static type inference
pub mod infer;
/// SQL lexer
#[allow(missing_docs)]
pub mod lexer;
/// SQL parser
#[allow(missing_docs)]
pub mod parser;

// Re-export main types
pub use ast::*;
pub use eval::{evaluate, is_aggregate_function, Scope, AGGREGATE_FUNCTIONS};
pub use executor::{execute, Executor};
pub use infer::{infer_fields, infer_type};
pub use lexer::{tokenize, Lexer, LexerError, Token, TokenKind};
pub use parser::{parse, ParseError, Parser};

use crate::error::Result;
use crate::tables::{Row, TablesSnapshot};

/// Parse and run `code` against `tables`, with `ctx` as the outermost
/// name scope
pub fn eval_sql(code: &str, tables: &dyn TablesSnapshot, ctx: &Row) -> Result<Vec<Row>> {
    let select = parse(code)?;
    execute(&select, tables, ctx)
}
