//! # Work Order Core
//!
//! `workorder-core` provides the shared vocabulary used by every other crate
//! in this workspace: the [`Scalar`] value type and [`Context`] variable map
//! that flow through a recipe run, the [`QueryResult`]/[`DmlRecord`]/
//! [`RunOutcome`] data model a run produces, and the [`SqlProbe`]/
//! [`LlmClient`]/[`Clock`] traits through which the engine reaches its three
//! external collaborators (spec §6).
//!
//! This crate has no sibling dependencies within the workspace — it plays
//! the same role `automaat-core` plays for the `automaat` project: a small,
//! stable foundation the other crates build on.
//!
//! * [`workorder-expr`][e] — the predicate evaluator that guards branch
//!   conditions.
//! * [`workorder-template`][t] — the `{name}` substitution renderer.
//! * [`workorder-recipes`][r] — the recipe catalog model, loader, and
//!   validator.
//! * [`workorder-matcher`][m] — matches free text to a recipe via an
//!   injected [`LlmClient`].
//! * [`workorder-interpreter`][i] — the step state machine that produces a
//!   [`RunOutcome`].
//! * [`workorder-sql-guard`][g] — enforces the read-only half of the
//!   [`SqlProbe`] contract.
//! * [`workorder-runtime`][rt] — wires everything together behind a worker
//!   pool.
//!
//! [e]: ../workorder_expr/index.html
//! [t]: ../workorder_template/index.html
//! [r]: ../workorder_recipes/index.html
//! [m]: ../workorder_matcher/index.html
//! [i]: ../workorder_interpreter/index.html
//! [g]: ../workorder_sql_guard/index.html
//! [rt]: ../workorder_runtime/index.html

#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

mod context;
mod dml;
mod interfaces;
mod outcome;
mod query;
mod scalar;

pub use context::Context;
pub use dml::{DmlKind, DmlRecord, Risk};
pub use interfaces::{Clock, LlmClient, LlmError, ProbeError, SqlProbe, SystemClock};
pub use outcome::{EngineErrorKind, OperationKind, RunOutcome, StepDecision, TraceEntry};
pub use query::QueryResult;
pub use scalar::Scalar;
