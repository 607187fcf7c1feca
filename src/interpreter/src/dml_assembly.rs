//! Finalizes a completed run's DML accumulator into the reviewable artifact
//! named in spec §6: distinct affected tables, a reviewer-facing risk hint
//! (spec §4.F), and the recipe/task identification the email layer needs.
//! Risk is a hint only — it never gates emission (spec §4.F, §8).

use workorder_core::{Context, DmlKind, DmlRecord, Risk};
use workorder_recipes::Recipe;

/// The record handed to the (out-of-scope) email layer once a run completes
/// (spec §6, "DML output artifact").
#[derive(Clone, Debug)]
pub struct DmlArtifact {
    /// The upstream task identifier this run was processing.
    pub task_id: String,
    /// The matched recipe's `work_order_type`.
    pub recipe_type: String,
    /// The distinct tables touched, in first-appearance order.
    pub affected_tables: Vec<String>,
    /// A reviewer-facing urgency hint (spec §4.F). Never gates emission.
    pub risk: Risk,
    /// The matched recipe's description, carried through for reviewer
    /// context.
    pub description: String,
    /// The accumulated DML records, in execution order.
    pub dml: Vec<DmlRecord>,
    /// The context as it stood at the end of the run.
    pub context_snapshot: Context,
}

/// Builds a [`DmlArtifact`] from a completed run's accumulator.
///
/// `task_id` is the upstream system's identifier for the work order being
/// processed; `recipe` is the recipe that was matched and run.
#[must_use]
pub fn assemble_artifact(task_id: impl Into<String>, recipe: &Recipe, dml: Vec<DmlRecord>, context_snapshot: Context) -> DmlArtifact {
    let risk = classify_risk(&dml);
    let affected_tables = distinct_tables(&dml);

    DmlArtifact {
        task_id: task_id.into(),
        recipe_type: recipe.work_order_type.clone(),
        affected_tables,
        risk,
        description: recipe.description.clone(),
        dml,
        context_snapshot,
    }
}

fn distinct_tables(dml: &[DmlRecord]) -> Vec<String> {
    let mut tables = Vec::new();
    for record in dml {
        if !tables.contains(&record.table) {
            tables.push(record.table.clone());
        }
    }
    tables
}

/// Classifies the risk of a finalized DML accumulator per the rule table in
/// spec §4.F:
///
/// * `high` — any `UPDATE`/`DELETE` whose rendered `WHERE` is empty, or
///   contains no comparison token.
/// * `medium` — any `DELETE` not already `high`, or any `UPDATE` touching
///   more than one table across the accumulator.
/// * `low` — everything else.
fn classify_risk(dml: &[DmlRecord]) -> Risk {
    let any_high = dml.iter().any(|record| {
        matches!(record.kind, DmlKind::Update | DmlKind::Delete) && is_unguarded_where(record)
    });
    if any_high {
        return Risk::High;
    }

    let any_bare_delete = dml.iter().any(|record| record.kind == DmlKind::Delete);
    let update_tables: std::collections::HashSet<&str> =
        dml.iter().filter(|record| record.kind == DmlKind::Update).map(|record| record.table.as_str()).collect();

    if any_bare_delete || update_tables.len() > 1 {
        return Risk::Medium;
    }

    Risk::Low
}

/// `true` if `record`'s rendered `WHERE` clause is empty or has no
/// comparison token (`=`, `<`, `>`), i.e. it is unguarded and would affect
/// every row in the table.
fn is_unguarded_where(record: &DmlRecord) -> bool {
    let where_clause = rendered_where_clause(&record.rendered_sql);
    match where_clause {
        None => true,
        Some(clause) => clause.trim().is_empty() || !clause.contains(['=', '<', '>']),
    }
}

/// Extracts the text following the last `WHERE` keyword in a rendered
/// statement, case-insensitively. `rendered_sql` is assembled by this
/// workspace's own [`crate::run`], so a well-formed `UPDATE`/`DELETE` always
/// has one; `None` only if the statement was built without a `WHERE` clause
/// at all (itself a sign the recipe never bounded the statement).
fn rendered_where_clause(rendered_sql: &str) -> Option<&str> {
    let upper = rendered_sql.to_ascii_uppercase();
    let index = upper.rfind(" WHERE ")?;
    Some(&rendered_sql[index + " WHERE ".len()..])
}
