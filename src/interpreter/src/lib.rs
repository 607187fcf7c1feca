//! # Work Order Step Interpreter
//!
//! `workorder-interpreter` is the small virtual machine at the center of the
//! work-order mutation engine (spec §2 components E and F). [`run`] drives a
//! [`Recipe`](workorder_recipes::Recipe)'s step list to completion against a
//! [`Context`](workorder_core::Context): `current_step` is its program
//! counter, `context` is its frame, branches are conditional jumps, and
//! `iterations` is its step budget. Jumps are first-class here — this is
//! deliberately not "walk the list and stop at the first `RETURN_*`" (spec
//! §9).
//!
//! [`dml_assembly::assemble_artifact`] finalizes a completed run's DML
//! accumulator into the reviewable artifact named in spec §6: distinct
//! affected tables, a reviewer-facing risk hint, and the recipe/task
//! identification the email layer needs but that has no place in
//! [`RunOutcome`](workorder_core::RunOutcome) itself.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

mod dml_assembly;
mod interpreter;

pub use dml_assembly::{assemble_artifact, DmlArtifact};
pub use interpreter::{run, MAX_ITERATIONS};
