//! The on-disk recipe document shape (spec §3). Deserialized directly from
//! the JSON recipe files a [`crate::RecipeStore`] loads; kept-step kind
//! consistency (e.g. `UPDATE` requires `set`/`where`, `INSERT` requires
//! `values`) is enforced by the type system itself via [`DmlOperation`]'s
//! tagged variants, rather than by a separate validation pass.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single catalog entry: a named kind of work order and the steps that
/// carry it out.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub work_order_type: String,
    pub description: String,
    pub steps: Vec<Step>,
    /// An optional template rendered (in [`workorder_template::Mode::Raw`])
    /// into the final operator-facing summary once a run completes.
    #[serde(default)]
    pub final_sql_template: Option<String>,
}

impl Recipe {
    /// The step the interpreter starts at: the lowest-numbered step (spec
    /// §4.C, "exactly one entry step").
    #[must_use]
    pub fn entry_step(&self) -> Option<u32> {
        self.steps.iter().map(|step| step.step).min()
    }

    #[must_use]
    pub fn step(&self, number: u32) -> Option<&Step> {
        self.steps.iter().find(|step| step.step == number)
    }
}

/// One numbered step within a [`Recipe`].
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Step {
    pub step: u32,
    #[serde(flatten)]
    pub kind: Kind,
}

/// The four step kinds (spec §3), discriminated on-disk by an `"operation"`
/// field.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "operation")]
pub enum Kind {
    #[serde(rename = "QUERY")]
    Query {
        table: String,
        #[serde(rename = "where")]
        where_clause: String,
        output_fields: Vec<String>,
        #[serde(default)]
        on_success: Option<Branch>,
        #[serde(default)]
        on_failure: Option<Branch>,
    },
    #[serde(rename = "GENERATE_DML")]
    GenerateDml {
        table: String,
        #[serde(flatten)]
        operation: DmlOperation,
        /// Explicit successor step. Absent or `null` falls through to
        /// `step + 1`, or terminates if no such step exists (spec §4.E).
        #[serde(default)]
        next_step: Option<u32>,
    },
    #[serde(rename = "RETURN_SUCCESS")]
    ReturnSuccess {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename = "RETURN_ERROR")]
    ReturnError { message: String },
}

/// The kind-specific fields of a `GENERATE_DML` step, discriminated by a
/// `"type"` field. Each variant carries exactly the fields its DML kind
/// needs, so a `GENERATE_DML` step with a `set` field but `type: "INSERT"`
/// is a schema parse failure rather than a runtime surprise.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum DmlOperation {
    #[serde(rename = "UPDATE")]
    Update {
        set: IndexMap<String, String>,
        #[serde(rename = "where")]
        where_clause: String,
    },
    #[serde(rename = "INSERT")]
    Insert { values: IndexMap<String, String> },
    #[serde(rename = "DELETE")]
    Delete {
        #[serde(rename = "where")]
        where_clause: String,
    },
}

/// An unconditional or predicate-guarded jump (spec §4.E).
///
/// `next_step` is the jump target when `condition` is absent or evaluates
/// truthy; `null` means "terminate the run successfully" rather than
/// "fall through". `else_step` is the falsy target and is required by
/// [`crate::validate::validate`] whenever `condition` is present — the JSON
/// key must be present (even if its value is `null`) for a conditional
/// branch to load.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Branch {
    #[serde(default)]
    pub condition: Option<String>,
    pub next_step: Option<u32>,
    #[serde(default)]
    pub else_step: Option<u32>,
}
