//! The result of running a recipe to completion (spec §3, §7).

use crate::{Context, DmlRecord};
use chrono::{DateTime, Utc};
use std::fmt;

/// Which kind of step produced a [`TraceEntry`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind {
    /// A `QUERY` step.
    Query,
    /// A `GENERATE_DML` step.
    GenerateDml,
    /// A `RETURN_SUCCESS` step.
    ReturnSuccess,
    /// A `RETURN_ERROR` step.
    ReturnError,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => f.write_str("QUERY"),
            OperationKind::GenerateDml => f.write_str("GENERATE_DML"),
            OperationKind::ReturnSuccess => f.write_str("RETURN_SUCCESS"),
            OperationKind::ReturnError => f.write_str("RETURN_ERROR"),
        }
    }
}

/// What the interpreter decided to do after executing a step. Kept as a
/// typed enum (rather than a free-form string) so trace entries stay
/// queryable, while still rendering to a single human-readable line for
/// operator diagnosis.
#[derive(Clone, Debug)]
pub enum StepDecision {
    /// Transitioned to the given step, or terminated if `None`.
    Advanced { to: Option<u32> },
    /// A branch condition was evaluated and taken (or not).
    BranchTaken { truthy: bool, to: Option<u32> },
    /// A `QUERY` step found zero rows and fell back to `on_failure`.
    FellBackOnFailure { to: u32 },
    /// A `QUERY` step found more than one row; the first was used and a
    /// warning recorded, per spec §4.E(d).
    AmbiguousRows { row_count: usize },
    /// A `GENERATE_DML` step appended a record to the accumulator.
    DmlAppended,
    /// A `RETURN_SUCCESS` step terminated the run.
    ReturnedSuccess,
    /// A `RETURN_ERROR` step terminated the run.
    ReturnedError,
}

impl fmt::Display for StepDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepDecision::Advanced { to: Some(step) } => write!(f, "advanced to step {}", step),
            StepDecision::Advanced { to: None } => write!(f, "terminated"),
            StepDecision::BranchTaken { truthy, to: Some(step) } => {
                write!(f, "branch ({}) -> step {}", truthy, step)
            }
            StepDecision::BranchTaken { truthy, to: None } => {
                write!(f, "branch ({}) -> terminated", truthy)
            }
            StepDecision::FellBackOnFailure { to } => write!(f, "query failed, fell back to step {}", to),
            StepDecision::AmbiguousRows { row_count } => {
                write!(f, "warning: {} rows returned, used first", row_count)
            }
            StepDecision::DmlAppended => write!(f, "appended DML record"),
            StepDecision::ReturnedSuccess => write!(f, "returned success"),
            StepDecision::ReturnedError => write!(f, "returned error"),
        }
    }
}

/// One entry in a run's `steps_trace` (spec §3): `(step_number,
/// operation_kind, decision)` plus a timestamp for operator diagnosis.
#[derive(Clone, Debug)]
pub struct TraceEntry {
    /// The step number this entry describes.
    pub step: u32,
    /// The kind of step that ran.
    pub operation: OperationKind,
    /// What the interpreter decided to do.
    pub decision: StepDecision,
    /// When this entry was recorded, from the injected [`crate::Clock`].
    pub at: DateTime<Utc>,
}

/// The taxonomy of fatal engine-level failures (spec §7). Distinct from
/// [`RunOutcome::UserError`], which is a successful `RETURN_ERROR` step, not
/// an engine failure.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineErrorKind {
    /// A `QUERY` step found zero rows (or the probe errored) and no
    /// `on_failure` branch was defined for that step.
    QueryFailed,
    /// A branch predicate failed to evaluate.
    EvalError,
    /// A template failed to render due to a missing variable.
    RenderError,
    /// A transition targeted a step number that does not exist. Should be
    /// unreachable after recipe-load validation (spec §4.C); defensive.
    BadJump,
    /// The 100-iteration cap (spec §4.E) was exceeded.
    IterationLimit,
    /// The run was cancelled at a suspension point (spec §5).
    Cancelled,
    /// `current_step` became `null` with an empty accumulator and no prior
    /// `UserError` (spec §4.E).
    NoDmlProduced,
    /// No recipe cleared the matcher's confidence threshold (spec §4.D, §7).
    /// Surfaced directly; never retried.
    NoMatch,
    /// The LLM call failed, or its reply could not be parsed, on both the
    /// initial attempt and the single retry (spec §7).
    MatchError,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineErrorKind::QueryFailed => f.write_str("query failed"),
            EngineErrorKind::EvalError => f.write_str("predicate evaluation failed"),
            EngineErrorKind::RenderError => f.write_str("template rendering failed"),
            EngineErrorKind::BadJump => f.write_str("jump to non-existent step"),
            EngineErrorKind::IterationLimit => f.write_str("iteration limit exceeded"),
            EngineErrorKind::Cancelled => f.write_str("run cancelled"),
            EngineErrorKind::NoDmlProduced => f.write_str("no DML produced"),
            EngineErrorKind::NoMatch => f.write_str("no recipe matched"),
            EngineErrorKind::MatchError => f.write_str("recipe matching failed"),
        }
    }
}

/// The outcome of running a recipe to completion or failure (spec §3).
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// The recipe ran to a `RETURN_SUCCESS` step, or fell off the end of its
    /// step list with a non-empty DML accumulator.
    Completed {
        /// The accumulated DML records, in execution order.
        dml: Vec<DmlRecord>,
        /// The final context, for inclusion in the review artifact.
        context_snapshot: Context,
        /// The full execution trace.
        steps_trace: Vec<TraceEntry>,
    },
    /// The recipe hit a `RETURN_ERROR` step. Not an engine failure — this is
    /// the recipe author's own error path.
    UserError {
        /// The rendered error message.
        message: String,
        /// The full execution trace.
        steps_trace: Vec<TraceEntry>,
    },
    /// A fatal, unrecoverable failure in the engine itself.
    EngineError {
        /// Which kind of failure occurred.
        kind: EngineErrorKind,
        /// A human-readable detail message, including the failing step
        /// number where applicable.
        detail: String,
        /// The trace accumulated before the failure.
        steps_trace: Vec<TraceEntry>,
    },
}

impl RunOutcome {
    /// The trace accumulated during the run, regardless of outcome variant.
    #[must_use]
    pub fn steps_trace(&self) -> &[TraceEntry] {
        match self {
            RunOutcome::Completed { steps_trace, .. }
            | RunOutcome::UserError { steps_trace, .. }
            | RunOutcome::EngineError { steps_trace, .. } => steps_trace,
        }
    }

    /// `true` if this outcome is [`RunOutcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}
