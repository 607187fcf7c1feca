//! # Work Order Expression Evaluator
//!
//! `workorder-expr` evaluates branch predicates (spec §4.A) against a
//! [`Context`]. It accepts exactly the grammar documented on [`eval`] and
//! nothing else: there is no reflective dispatch, no function call surface,
//! no attribute access, and no host-language eval facility anywhere in this
//! crate. A hand-written lexer (`lexer.rs`) produces tokens, a hand-written
//! recursive-descent parser (`parser.rs`) produces a closed AST
//! (`ast.rs`), and `eval.rs` evaluates that AST with a plain `match`. This is
//! the single highest-leverage safety property in the whole workspace —
//! resist the urge to "just" shell out to a general expression crate here.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

mod ast;
mod eval;
mod lexer;
mod parser;

use std::{error, fmt};
use workorder_core::Context;

/// The maximum accepted predicate length, in bytes (spec §4.A: "bounded,
/// e.g. 2 KiB" — used to bound parse time against pathological input).
pub const MAX_PREDICATE_LEN: usize = 2048;

/// Evaluates `predicate_text` against `context`.
///
/// # Grammar
///
/// A predicate is one of:
///
/// * `<atom> <cmp> <atom>` where `<cmp>` is one of `== != < <= > >=`
/// * `<atom> in <list-literal>`
/// * `<atom> not in <list-literal>`
/// * `( <predicate> )`
/// * `<predicate> and <predicate>`
/// * `<predicate> or <predicate>`
/// * `not <predicate>`
///
/// An `<atom>` is a variable reference `{name}`, a single- or double-quoted
/// string, a numeric literal, `true`, `false`, or `null`. A `<list-literal>`
/// is `[` atoms separated by `,` `]`. Whitespace is insignificant.
/// Precedence, tightest to loosest: comparison/`in` atoms, `not`, `and`,
/// `or`.
///
/// # Errors
///
/// Returns [`EvalError`] if `predicate_text` exceeds [`MAX_PREDICATE_LEN`],
/// contains a token outside the grammar, fails to parse, or performs a
/// cross-type ordering comparison (e.g. `'a' < 1`).
pub fn eval(predicate_text: &str, context: &Context) -> Result<bool, EvalError> {
    if predicate_text.len() > MAX_PREDICATE_LEN {
        return Err(EvalError::InputTooLarge);
    }

    let tokens = lexer::lex(predicate_text)?;
    let predicate = parser::parse(&tokens)?;
    eval::evaluate(&predicate, context)
}

/// Ways predicate evaluation can fail (spec §4.A, §7).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EvalError {
    /// A token outside the grammar's alphabet was encountered.
    IllegalToken(String),
    /// The token stream did not match the grammar.
    ParseFailure(String),
    /// A `<`, `<=`, `>`, or `>=` comparison was attempted between two
    /// non-null atoms of different, non-numeric types.
    CrossTypeOrdering,
    /// The predicate text exceeded [`MAX_PREDICATE_LEN`].
    InputTooLarge,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::IllegalToken(token) => write!(f, "illegal token: {}", token),
            EvalError::ParseFailure(reason) => write!(f, "parse error: {}", reason),
            EvalError::CrossTypeOrdering => write!(f, "cannot order values of different types"),
            EvalError::InputTooLarge => write!(f, "predicate exceeds {} bytes", MAX_PREDICATE_LEN),
        }
    }
}

impl error::Error for EvalError {}
