//! Wires the recipe catalog, matcher, and step interpreter behind the
//! `run`/`reload_catalog` entry points named in spec §6. This is the one
//! place in the workspace that owns all three injected capabilities
//! (`LlmClient`, `SqlProbe`, `Clock`) and the mutable recipe catalog behind
//! them; every other crate takes these as call parameters instead.

use crate::config::RuntimeConfig;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use workorder_core::{Clock, Context, EngineErrorKind, LlmClient, LlmError, RunOutcome, SqlProbe};
use workorder_interpreter::{assemble_artifact, DmlArtifact};
use workorder_matcher::{match_work_order, MatchOutcome};
use workorder_recipes::{CatalogStatus, Recipe, RecipeStore};

/// The result of running one work order end to end: the bare
/// [`RunOutcome`] spec §6 contracts for, plus the review artifact built
/// from it when the run completed — spec §6's "DML output artifact", which
/// needs the matched recipe and the caller's task id, neither of which
/// `RunOutcome` itself carries.
#[derive(Debug)]
pub struct WorkOrderResult {
    /// The upstream system's identifier for the work order processed.
    pub task_id: String,
    /// What the interpreter did.
    pub outcome: RunOutcome,
    /// Present only when `outcome` is [`RunOutcome::Completed`].
    pub artifact: Option<DmlArtifact>,
}

/// Owns the recipe catalog and the three injected external capabilities,
/// and drives work orders through matching and interpretation.
#[derive(Debug)]
pub struct WorkOrderService {
    catalog: tokio::sync::RwLock<RecipeStore>,
    llm: Arc<dyn LlmClient>,
    probe: Arc<dyn SqlProbe>,
    clock: Arc<dyn Clock>,
    config: RuntimeConfig,
}

impl WorkOrderService {
    /// Builds a service around an already-loaded catalog and the three
    /// capabilities it will inject into every run.
    #[must_use]
    pub fn new(catalog: RecipeStore, llm: Arc<dyn LlmClient>, probe: Arc<dyn SqlProbe>, clock: Arc<dyn Clock>, config: RuntimeConfig) -> Self {
        Self { catalog: tokio::sync::RwLock::new(catalog), llm, probe, clock, config }
    }

    /// Replaces the catalog with the recipes found under `dir` (spec §6
    /// `reload_catalog`). Runs already in flight keep using the recipe they
    /// were matched against; only subsequent calls to [`Self::run`] see the
    /// new catalog.
    pub async fn reload_catalog(&self, dir: &Path) -> CatalogStatus {
        self.catalog.write().await.load_directory(dir)
    }

    /// Matches `user_text` against the current catalog and, on a match,
    /// runs the matched recipe to completion (spec §6 `run`).
    ///
    /// `seed_params` are layered under whatever the matcher extracts from
    /// `user_text` (matcher output wins on key collision, spec §4.E).
    /// `cancellation` should be a fresh token per call; firing it aborts the
    /// run at its next suspension point (spec §5).
    pub async fn run(&self, task_id: impl Into<String>, user_text: &str, seed_params: Context, cancellation: &CancellationToken) -> WorkOrderResult {
        let task_id = task_id.into();

        let matched = match self.match_with_retry(user_text, cancellation).await {
            MatchPhase::Matched { recipe, extracted_params } => {
                let mut context = seed_params;
                context.merge_overriding(&extracted_params);
                (recipe, context)
            }
            MatchPhase::Unmatched => {
                return WorkOrderResult {
                    task_id,
                    outcome: RunOutcome::EngineError {
                        kind: EngineErrorKind::NoMatch,
                        detail: "no recipe matched the given text with sufficient confidence".to_owned(),
                        steps_trace: Vec::new(),
                    },
                    artifact: None,
                };
            }
            MatchPhase::MatchError(reason) => {
                return WorkOrderResult {
                    task_id,
                    outcome: RunOutcome::EngineError { kind: EngineErrorKind::MatchError, detail: reason, steps_trace: Vec::new() },
                    artifact: None,
                };
            }
            MatchPhase::Cancelled => {
                return WorkOrderResult {
                    task_id,
                    outcome: RunOutcome::EngineError {
                        kind: EngineErrorKind::Cancelled,
                        detail: "cancelled during recipe matching".to_owned(),
                        steps_trace: Vec::new(),
                    },
                    artifact: None,
                };
            }
        };
        let (recipe, context) = matched;

        let outcome =
            workorder_interpreter::run(&recipe, context, self.probe.as_ref(), self.clock.as_ref(), cancellation, self.config.sql_probe_timeout)
                .await;

        let artifact = match &outcome {
            RunOutcome::Completed { dml, context_snapshot, .. } => {
                Some(assemble_artifact(task_id.clone(), &recipe, dml.clone(), context_snapshot.clone()))
            }
            RunOutcome::UserError { .. } | RunOutcome::EngineError { .. } => None,
        };

        WorkOrderResult { task_id, outcome, artifact }
    }

    /// Issues a single retry on [`MatchOutcome::MatchError`] (spec §7:
    /// "`MatchError` — ... Single retry, then surface"; §7's propagation
    /// policy makes retrying the caller's concern, not the matcher's own),
    /// with `cancellation` checked before each attempt and raced against
    /// every `LlmClient::complete` call the matcher makes within it (spec §5:
    /// "a run is cancellable at any suspension point ... cancellation must be
    /// observed before the next external call").
    async fn match_with_retry(&self, user_text: &str, cancellation: &CancellationToken) -> MatchPhase {
        if cancellation.is_cancelled() {
            return MatchPhase::Cancelled;
        }

        let first = self.match_once(user_text, cancellation).await;
        if cancellation.is_cancelled() {
            return MatchPhase::Cancelled;
        }

        match first {
            MatchOutcome::MatchError(reason) => {
                warn!(reason = %reason, "recipe match failed, retrying once");
                let retried = self.match_once(user_text, cancellation).await;
                if cancellation.is_cancelled() {
                    MatchPhase::Cancelled
                } else {
                    retried.into()
                }
            }
            other => other.into(),
        }
    }

    /// Runs one matcher attempt with `cancellation` wired into every
    /// `LlmClient::complete` call [`match_work_order`] issues.
    async fn match_once(&self, user_text: &str, cancellation: &CancellationToken) -> MatchOutcome {
        let catalog = self.catalog.read().await;
        let llm = CancellableLlmClient { inner: self.llm.as_ref(), cancellation };
        match_work_order(user_text, &catalog, &llm, self.config.llm_timeout).await
    }
}

/// The outcome of [`WorkOrderService::match_with_retry`], adding the
/// `Cancelled` case [`MatchOutcome`] itself has no vocabulary for — matching
/// is an internal detail of [`WorkOrderService::run`], so cancellation during
/// it is folded in here rather than widening the matcher crate's own,
/// cancellation-agnostic public enum.
enum MatchPhase {
    Matched { recipe: Recipe, extracted_params: Context },
    Unmatched,
    MatchError(String),
    Cancelled,
}

impl From<MatchOutcome> for MatchPhase {
    fn from(outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::Matched { recipe, extracted_params } => MatchPhase::Matched { recipe, extracted_params },
            MatchOutcome::Unmatched => MatchPhase::Unmatched,
            MatchOutcome::MatchError(reason) => MatchPhase::MatchError(reason),
        }
    }
}

/// Wraps an [`LlmClient`] so every call it makes is raced against
/// `cancellation` via `tokio::select!`, the same pattern
/// `workorder_interpreter::run_query_step` uses around its `SqlProbe::probe`
/// call. Lets the matcher's own two sequential `complete` calls stay
/// cancellation-agnostic while still observing a token fired mid-call.
#[derive(Debug)]
struct CancellableLlmClient<'a> {
    inner: &'a dyn LlmClient,
    cancellation: &'a CancellationToken,
}

#[async_trait]
impl<'a> LlmClient for CancellableLlmClient<'a> {
    async fn complete(&self, prompt: &str, deadline: Duration) -> Result<String, LlmError> {
        if self.cancellation.is_cancelled() {
            return Err(LlmError::Transport("cancelled".to_owned()));
        }
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(LlmError::Transport("cancelled".to_owned())),
            result = self.inner.complete(prompt, deadline) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use workorder_core::{LlmError, ProbeError, QueryResult, SystemClock};

    #[derive(Debug)]
    struct ScriptedLlm {
        replies: Mutex<Vec<Result<String, LlmError>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<&str, LlmError>>) -> Self {
            let replies = replies.into_iter().map(|r| r.map(str::to_owned)).rev().collect();
            Self { replies: Mutex::new(replies) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _prompt: &str, _deadline: Duration) -> Result<String, LlmError> {
            self.replies.lock().unwrap().pop().unwrap_or(Err(LlmError::Timeout))
        }
    }

    #[derive(Debug)]
    struct NullProbe;

    #[async_trait]
    impl SqlProbe for NullProbe {
        async fn probe(&self, _sql: &str, _deadline: Duration) -> Result<QueryResult, ProbeError> {
            Err(ProbeError::Backend("no probe configured".to_owned()))
        }
    }

    fn catalog_with_one_recipe() -> RecipeStore {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cancel_marine_order.json"),
            r#"{
                "work_order_type": "cancel_marine_order",
                "description": "Cancels a marine order by receipt number",
                "steps": [{ "step": 0, "operation": "RETURN_SUCCESS" }]
            }"#,
        )
        .unwrap();
        let mut store = RecipeStore::new();
        store.load_directory(dir.path());
        store
    }

    fn service(llm: ScriptedLlm) -> WorkOrderService {
        WorkOrderService::new(catalog_with_one_recipe(), Arc::new(llm), Arc::new(NullProbe), Arc::new(SystemClock), RuntimeConfig::default())
    }

    #[tokio::test]
    async fn test_matched_recipe_runs_to_completion() {
        let llm = ScriptedLlm::new(vec![
            Ok(r#"{"matched_index": 1, "confidence": 0.95, "reasoning": "exact"}"#),
            Ok(r#"{"receipt_order_number": "R1"}"#),
        ]);
        let service = service(llm);
        let cancellation = CancellationToken::new();

        let result = service.run("task-1", "cancel order R1", Context::new(), &cancellation).await;

        assert!(result.outcome.is_completed());
        assert!(result.artifact.is_some());
        assert_eq!(result.artifact.unwrap().recipe_type, "cancel_marine_order");
    }

    #[tokio::test]
    async fn test_unmatched_is_no_match_engine_error() {
        let llm = ScriptedLlm::new(vec![Ok(r#"{"matched_index": 1, "confidence": 0.1, "reasoning": "unsure"}"#)]);
        let service = service(llm);
        let cancellation = CancellationToken::new();

        let result = service.run("task-1", "something vague", Context::new(), &cancellation).await;

        assert!(matches!(result.outcome, RunOutcome::EngineError { kind: EngineErrorKind::NoMatch, .. }));
        assert!(result.artifact.is_none());
    }

    #[tokio::test]
    async fn test_match_error_is_retried_once_then_succeeds() {
        let llm = ScriptedLlm::new(vec![
            Ok("not json"),
            Ok(r#"{"matched_index": 1, "confidence": 0.95, "reasoning": "exact"}"#),
            Ok(r#"{"receipt_order_number": "R1"}"#),
        ]);
        let service = service(llm);
        let cancellation = CancellationToken::new();

        let result = service.run("task-1", "cancel order R1", Context::new(), &cancellation).await;

        assert!(result.outcome.is_completed());
    }

    #[tokio::test]
    async fn test_match_error_surfaces_after_the_retry_also_fails() {
        let llm = ScriptedLlm::new(vec![Ok("not json"), Ok("still not json")]);
        let service = service(llm);
        let cancellation = CancellationToken::new();

        let result = service.run("task-1", "cancel order R1", Context::new(), &cancellation).await;

        assert!(matches!(result.outcome, RunOutcome::EngineError { kind: EngineErrorKind::MatchError, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_run_short_circuits_before_matching() {
        let llm = ScriptedLlm::new(vec![]);
        let service = service(llm);
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let result = service.run("task-1", "cancel order R1", Context::new(), &cancellation).await;

        assert!(matches!(result.outcome, RunOutcome::EngineError { kind: EngineErrorKind::Cancelled, .. }));
        assert!(result.artifact.is_none());
    }

    #[derive(Debug)]
    struct StallingLlm;

    #[async_trait]
    impl LlmClient for StallingLlm {
        async fn complete(&self, _prompt: &str, _deadline: Duration) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("unreachable".to_owned())
        }
    }

    #[tokio::test]
    async fn test_cancelled_during_matcher_llm_call_yields_cancelled_not_match_error() {
        let service =
            WorkOrderService::new(catalog_with_one_recipe(), Arc::new(StallingLlm), Arc::new(NullProbe), Arc::new(SystemClock), RuntimeConfig::default());
        let cancellation = CancellationToken::new();
        let canceller = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = service.run("task-1", "cancel order R1", Context::new(), &cancellation).await;

        assert!(matches!(result.outcome, RunOutcome::EngineError { kind: EngineErrorKind::Cancelled, .. }));
        assert!(result.artifact.is_none());
    }

    #[tokio::test]
    async fn test_matched_recipe_with_query_step_runs_against_a_real_probe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("update_telco_customer.json"),
            r#"{
                "work_order_type": "update_telco_customer",
                "description": "Updates a telco customer's plan",
                "steps": [
                    {
                        "step": 0, "operation": "QUERY", "table": "t_customer",
                        "where": "customerID = {customerID}", "output_fields": ["plan"],
                        "on_success": { "next_step": 1 }
                    },
                    {
                        "step": 1, "operation": "GENERATE_DML", "table": "t_customer", "type": "UPDATE",
                        "set": { "plan": "{new_plan}" }, "where": "customerID = {customerID}", "next_step": 2
                    },
                    { "step": 2, "operation": "RETURN_SUCCESS" }
                ]
            }"#,
        )
        .unwrap();
        let mut catalog = RecipeStore::new();
        catalog.load_directory(dir.path());

        let llm = ScriptedLlm::new(vec![
            Ok(r#"{"matched_index": 1, "confidence": 0.9, "reasoning": "exact"}"#),
            Ok(r#"{"customerID": "0002-ORFBO", "new_plan": "Premium"}"#),
        ]);
        let probe = workorder_sql_guard::FakeProbe::new().with_fixture(
            "SELECT plan FROM t_customer WHERE customerID = '0002-ORFBO'",
            QueryResult::new(vec!["plan".to_owned()], vec![vec![workorder_core::Scalar::from("Basic")]]),
        );
        let service = WorkOrderService::new(catalog, Arc::new(llm), Arc::new(probe), Arc::new(SystemClock), RuntimeConfig::default());
        let cancellation = CancellationToken::new();

        let result = service.run("task-1", "upgrade 0002-ORFBO to Premium", Context::new(), &cancellation).await;

        match result.outcome {
            RunOutcome::Completed { dml, .. } => {
                assert_eq!(dml.len(), 1);
                assert_eq!(dml[0].rendered_sql, "UPDATE t_customer SET plan = 'Premium' WHERE customerID = '0002-ORFBO'");
            }
            other => panic!("expected Completed, got {:?}", other),
        }
        assert_eq!(result.artifact.unwrap().risk, workorder_core::Risk::Low);
    }

    #[tokio::test]
    async fn test_reload_catalog_replaces_recipes() {
        let service = service(ScriptedLlm::new(vec![]));
        let new_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            new_dir.path().join("update_telco_customer.json"),
            r#"{
                "work_order_type": "update_telco_customer",
                "description": "Updates a telco customer's plan",
                "steps": [{ "step": 0, "operation": "RETURN_SUCCESS" }]
            }"#,
        )
        .unwrap();

        let status = service.reload_catalog(new_dir.path()).await;
        assert_eq!(status.loaded, 1);

        let catalog = service.catalog.read().await;
        assert!(catalog.get("update_telco_customer").is_some());
        assert!(catalog.get("cancel_marine_order").is_none());
    }
}
