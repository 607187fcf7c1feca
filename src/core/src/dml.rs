//! The accumulated [`DmlRecord`] shape (spec §3, §4.F).

use crate::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of Data Manipulation Language statement a recipe can
/// generate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DmlKind {
    /// An `UPDATE` statement.
    Update,
    /// An `INSERT` statement.
    Insert,
    /// A `DELETE` statement.
    Delete,
}

impl fmt::Display for DmlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmlKind::Update => f.write_str("UPDATE"),
            DmlKind::Insert => f.write_str("INSERT"),
            DmlKind::Delete => f.write_str("DELETE"),
        }
    }
}

/// A reviewer-facing hint attached to the final DML artifact (spec §4.F).
/// Never gates emission — a hint, not a gate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Risk {
    /// Nothing about the statement suggests it needs extra scrutiny.
    Low,
    /// A `DELETE` not classified `High`, or an `UPDATE` touching more than
    /// one table across the accumulator.
    Medium,
    /// An `UPDATE`/`DELETE` whose rendered `WHERE` clause is empty or
    /// contains no comparison token.
    High,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Low => f.write_str("low"),
            Risk::Medium => f.write_str("medium"),
            Risk::High => f.write_str("high"),
        }
    }
}

/// One rendered change statement, produced by a `GENERATE_DML` step and
/// destined for human review (spec §3, §6).
#[derive(Clone, Debug)]
pub struct DmlRecord {
    /// The statement kind.
    pub kind: DmlKind,
    /// The table the statement targets.
    pub table: String,
    /// The fully rendered SQL, literals inlined, for human review display
    /// only. Never executed directly.
    pub rendered_sql: String,
    /// The same statement with each substituted value replaced by `?`, in
    /// left-to-right occurrence order. Paired with `parameters`, this is
    /// the form a downstream executor should actually run.
    pub template_sql: String,
    /// `(name, value)` pairs in left-to-right source order, aligned
    /// positionally with the `?` placeholders in `template_sql`.
    pub parameters: Vec<(String, Scalar)>,
    /// A short human-readable description of what this statement does,
    /// used in the review artifact.
    pub description: String,
}

impl DmlRecord {
    /// The number of `?` placeholders in `template_sql`. Per spec §8, this
    /// must always equal `parameters.len()`.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.template_sql.matches('?').count()
    }
}
