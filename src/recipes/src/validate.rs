//! The validation checklist a recipe must pass before it is added to the
//! catalog (spec §4.C). A recipe that fails any of these checks is omitted
//! from the catalog; the file's other siblings still load (spec §7).
//!
//! Two passes run over a recipe document:
//!
//! * [`validate_raw`] walks the untyped [`serde_json::Value`] to check a
//!   property the typed model can't express: a `Branch` with a `condition`
//!   key must also have an `else_step` key present, even if its value is
//!   `null`. `Option<String>`/`Option<u32>` can't distinguish "key absent"
//!   from "key present with value `null`", so this check runs before the
//!   document is deserialized into [`crate::model::Recipe`].
//! * [`validate_recipe`] checks everything else against the typed model:
//!   non-empty `work_order_type`, unique step numbers, and jump targets
//!   (`next_step`/`else_step`) that resolve to an existing step or `null`.
//!
//! `GENERATE_DML` kind consistency (an `UPDATE` step must carry `set` and
//! `where`, an `INSERT` step must carry `values`, and so on) is not checked
//! here at all — [`crate::model::DmlOperation`]'s tagged-enum shape makes an
//! inconsistent document a deserialization failure, so it never reaches
//! either pass.

use crate::model::{Kind, Recipe};
use serde_json::Value;
use std::collections::HashSet;
use std::{error, fmt};

/// Ways a recipe document can fail validation.
#[derive(Debug)]
pub enum ValidationError {
    /// `work_order_type` was empty or all-whitespace.
    EmptyWorkOrderType,
    /// A recipe had no steps at all.
    NoSteps,
    /// Two steps shared the same `step` number.
    DuplicateStepNumber(u32),
    /// A `next_step`/`else_step` referenced a step number that doesn't
    /// exist in the recipe.
    DanglingJumpTarget(u32),
    /// A branch had a `condition` but no `else_step` key.
    BranchMissingElseStep(u32),
    /// The document didn't parse as the expected step shape.
    Malformed(serde_json::Error),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyWorkOrderType => write!(f, "work_order_type must not be empty"),
            ValidationError::NoSteps => write!(f, "recipe has no steps"),
            ValidationError::DuplicateStepNumber(step) => write!(f, "duplicate step number: {}", step),
            ValidationError::DanglingJumpTarget(step) => {
                write!(f, "jump target does not resolve to an existing step: {}", step)
            }
            ValidationError::BranchMissingElseStep(step) => {
                write!(f, "step {} has a branch condition but no else_step", step)
            }
            ValidationError::Malformed(err) => write!(f, "malformed recipe document: {}", err),
        }
    }
}

impl error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ValidationError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::Malformed(err)
    }
}

/// Checks the untyped document for branch conditions missing an
/// `else_step` key.
pub fn validate_raw(raw: &Value) -> Result<(), ValidationError> {
    let steps = raw.get("steps").and_then(Value::as_array).into_iter().flatten();

    for step in steps {
        let step_number = step.get("step").and_then(Value::as_u64).unwrap_or_default() as u32;
        for field in ["on_success", "on_failure"] {
            if let Some(branch) = step.get(field) {
                check_branch_else_step(step_number, branch)?;
            }
        }
    }

    Ok(())
}

fn check_branch_else_step(step_number: u32, branch: &Value) -> Result<(), ValidationError> {
    let condition_present = branch.get("condition").is_some_and(|v| !v.is_null());
    if condition_present && branch.get("else_step").is_none() {
        return Err(ValidationError::BranchMissingElseStep(step_number));
    }
    Ok(())
}

/// Checks the typed model: non-empty type name, unique step numbers, and
/// jump targets that all resolve.
pub fn validate_recipe(recipe: &Recipe) -> Result<(), ValidationError> {
    if recipe.work_order_type.trim().is_empty() {
        return Err(ValidationError::EmptyWorkOrderType);
    }

    if recipe.steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }

    let mut seen = HashSet::new();
    for step in &recipe.steps {
        if !seen.insert(step.step) {
            return Err(ValidationError::DuplicateStepNumber(step.step));
        }
    }

    for step in &recipe.steps {
        for target in jump_targets(&step.kind) {
            if !seen.contains(&target) {
                return Err(ValidationError::DanglingJumpTarget(target));
            }
        }
    }

    Ok(())
}

fn jump_targets(kind: &Kind) -> Vec<u32> {
    let mut targets = Vec::new();
    let mut push_branch = |branch: &Option<crate::model::Branch>| {
        if let Some(branch) = branch {
            targets.extend(branch.next_step);
            targets.extend(branch.else_step);
        }
    };

    match kind {
        Kind::Query { on_success, on_failure, .. } => {
            push_branch(on_success);
            push_branch(on_failure);
        }
        Kind::GenerateDml { next_step, .. } => targets.extend(*next_step),
        Kind::ReturnSuccess { .. } | Kind::ReturnError { .. } => {}
    }

    targets
}
