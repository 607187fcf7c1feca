//! # Work Order SQL Guard
//!
//! `workorder-sql-guard` enforces the read-only half of the [`SqlProbe`]
//! contract (spec §6.1): a rendered SQL string is only ever handed to a
//! real backend once it has been parsed and shown to be a single `SELECT`
//! statement. The engine itself never constructs anything but `SELECT`s for
//! a probe call, but the boundary re-validates anyway — the probe must not
//! trust its caller.
//!
//! This crate also ships [`FakeProbe`], an in-memory [`SqlProbe`] driven by
//! exact-match fixtures, for use in interpreter and runtime tests that need
//! a probe without a real database.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect;
use sqlparser::parser::{Parser, ParserError};
use std::{error, fmt};

/// Parses `sql` and rejects anything but a single `SELECT` statement.
///
/// # Errors
///
/// Returns [`GuardError::Syntax`] if `sql` does not parse, [`GuardError::MultipleStatements`]
/// if more than one statement is present, and [`GuardError::NotReadOnly`] if
/// the single statement is not a `SELECT`.
pub fn validate(sql: &str) -> Result<(), GuardError> {
    let dialect = PostgreSqlDialect {};
    let ast = Parser::parse_sql(&dialect, sql.to_owned()).map_err(GuardError::from)?;

    if ast.len() != 1 {
        return Err(GuardError::MultipleStatements);
    }

    match ast[0] {
        Statement::Query(_) => Ok(()),
        _ => Err(GuardError::NotReadOnly),
    }
}

/// Ways [`validate`] can reject a statement.
#[derive(Debug)]
pub enum GuardError {
    /// More than one statement was found (separated by `;`).
    MultipleStatements,
    /// The statement parsed, but was not a `SELECT`.
    NotReadOnly,
    /// The statement did not parse as valid SQL.
    Syntax(String),
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::MultipleStatements => write!(f, "multiple SQL statements found"),
            GuardError::NotReadOnly => write!(f, "statement is not a read-only SELECT"),
            GuardError::Syntax(reason) => write!(f, "SQL syntax error: {}", reason),
        }
    }
}

impl error::Error for GuardError {}

impl From<ParserError> for GuardError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::ParserError(reason) | ParserError::TokenizerError(reason) => GuardError::Syntax(reason),
        }
    }
}

impl From<GuardError> for workorder_core::ProbeError {
    fn from(err: GuardError) -> Self {
        workorder_core::ProbeError::NotReadOnly(err.to_string())
    }
}

/// A copy of Postgres's identifier rules plus a `$` exception, so
/// placeholder-style identifiers (`$1`) parse as identifiers rather than
/// tokenizer errors.
#[derive(Copy, Clone, Debug)]
pub struct PostgreSqlDialect {}

impl Dialect for PostgreSqlDialect {
    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '$' || ch == '_'
    }
}

mod fake_probe;
pub use fake_probe::FakeProbe;
