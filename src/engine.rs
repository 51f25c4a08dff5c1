//! Engine facade
//!
//! The single entry point a host application calls: statement text in,
//! tabular result or error out. Orchestrates tokenizer, parser, validator
//! (SELECT only) and executor. Statements are processed one at a time and
//! atomically: on any error the catalog is left exactly as it was.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::executor::{Executor, Output};
use crate::sql::{validate, Lexer, Parser, Statement};

/// Execute a single SQL statement against the catalog.
///
/// DDL/DML mutates the catalog in place; SELECT leaves it untouched. The
/// caller has exclusive access to the catalog for the duration of the
/// call.
pub fn execute(sql: &str, catalog: &mut Catalog) -> Result<Output> {
    let tokens = Lexer::new(sql).tokenize()?;
    let mut statement = Parser::new(tokens).parse()?;

    if let Statement::Query(query) = &mut statement {
        validate(query, catalog)?;
    }

    Executor::new(catalog).execute(statement)
}
