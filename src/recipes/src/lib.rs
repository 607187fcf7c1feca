//! # Work Order Recipe Catalog
//!
//! `workorder-recipes` loads a directory of JSON recipe documents (spec §3)
//! into a validated, in-memory catalog keyed by `work_order_type`. A recipe
//! that fails validation is omitted from the catalog rather than failing
//! the whole load (spec §4.C, §7) — operators fix the one bad file and
//! reload, everything else keeps serving.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

mod model;
mod store;
mod validate;

pub use model::{Branch, DmlOperation, Kind, Recipe, Step};
pub use store::{CatalogStatus, LoadError, RecipeStore};
pub use validate::ValidationError;
