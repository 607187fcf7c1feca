//! The step state machine (spec §4.E): a sequential driver over a possibly
//! non-sequential control-flow graph, issuing read-only probes, evaluating
//! branch predicates, and appending rendered DML to an accumulator.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use workorder_core::{
    Clock, Context, DmlKind, DmlRecord, EngineErrorKind, OperationKind, QueryResult, RunOutcome, Scalar, SqlProbe,
    StepDecision, TraceEntry,
};
use workorder_recipes::{Branch, DmlOperation, Kind, Recipe, Step};
use workorder_template::Mode;

/// The loop protection cap named in spec §4.E. Exceeding it is a fatal
/// [`workorder_core::EngineErrorKind::IterationLimit`] — recipes are
/// expected to terminate well within this budget; it exists to catch
/// authoring mistakes (an accidental jump cycle), not to bound normal runs.
pub const MAX_ITERATIONS: u32 = 100;

/// Runs `recipe` to completion against `seed_context`.
///
/// `seed_context` should already hold the matcher-extracted parameters
/// layered over the upstream-supplied ones (spec §4.E: "matcher output wins
/// on key collision" — the caller is expected to have resolved that before
/// calling `run`, via [`Context::merge_overriding`]).
///
/// `probe` is awaited once per `QUERY` step; `cancellation` is observed
/// before every such await and, if already fired, short-circuits the call
/// entirely rather than letting it start (spec §5: "cancellation must be
/// observed before the next external call").
pub async fn run(
    recipe: &Recipe,
    seed_context: Context,
    probe: &dyn SqlProbe,
    clock: &dyn Clock,
    cancellation: &CancellationToken,
    probe_deadline: Duration,
) -> RunOutcome {
    let mut context = seed_context;
    let mut current_step = recipe.entry_step();
    let mut dml: Vec<DmlRecord> = Vec::new();
    let mut trace: Vec<TraceEntry> = Vec::new();
    let mut iterations = 0u32;

    let _span = tracing::span!(tracing::Level::INFO, "run", recipe = %recipe.work_order_type).entered();

    loop {
        let step_number = match current_step {
            Some(step_number) => step_number,
            None => {
                return if dml.is_empty() {
                    engine_error(EngineErrorKind::NoDmlProduced, "recipe terminated with no DML produced", trace)
                } else {
                    info!(dml_count = dml.len(), "run completed");
                    RunOutcome::Completed { dml, context_snapshot: context, steps_trace: trace }
                };
            }
        };

        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return engine_error(
                EngineErrorKind::IterationLimit,
                &format!("exceeded {} iterations at step {}", MAX_ITERATIONS, step_number),
                trace,
            );
        }

        if cancellation.is_cancelled() {
            return engine_error(EngineErrorKind::Cancelled, &format!("cancelled before step {}", step_number), trace);
        }

        let step = match recipe.step(step_number) {
            Some(step) => step,
            None => {
                return engine_error(EngineErrorKind::BadJump, &format!("no such step: {}", step_number), trace);
            }
        };

        match &step.kind {
            Kind::Query { table, where_clause, output_fields, on_success, on_failure } => {
                match run_query_step(
                    step,
                    table,
                    where_clause,
                    output_fields,
                    on_success.as_ref(),
                    on_failure.as_ref(),
                    recipe,
                    &mut context,
                    probe,
                    cancellation,
                    probe_deadline,
                    &mut trace,
                    clock,
                )
                .await
                {
                    Ok(next) => current_step = next,
                    Err(outcome) => return outcome,
                }
            }
            Kind::GenerateDml { table, operation, next_step } => {
                match run_generate_dml_step(step, table, operation, *next_step, recipe, &context, &mut dml, &mut trace, clock) {
                    Ok(next) => current_step = next,
                    Err(outcome) => return outcome,
                }
            }
            Kind::ReturnSuccess { .. } => {
                trace.push(TraceEntry {
                    step: step_number,
                    operation: OperationKind::ReturnSuccess,
                    decision: StepDecision::ReturnedSuccess,
                    at: clock.now(),
                });
                info!(step = step_number, "return_success");
                return RunOutcome::Completed { dml, context_snapshot: context, steps_trace: trace };
            }
            Kind::ReturnError { message } => {
                let rendered = workorder_template::render_error_message(message, &context);
                trace.push(TraceEntry {
                    step: step_number,
                    operation: OperationKind::ReturnError,
                    decision: StepDecision::ReturnedError,
                    at: clock.now(),
                });
                info!(step = step_number, message = %rendered, "return_error");
                return RunOutcome::UserError { message: rendered, steps_trace: trace };
            }
        }
    }
}

fn engine_error(kind: EngineErrorKind, detail: &str, steps_trace: Vec<TraceEntry>) -> RunOutcome {
    warn!(kind = %kind, detail, "engine error");
    RunOutcome::EngineError { kind, detail: detail.to_owned(), steps_trace }
}

/// Where a step should jump next: an explicit step, or `None` to terminate.
type Transition = Result<Option<u32>, RunOutcome>;

#[allow(clippy::too_many_arguments)]
async fn run_query_step(
    step: &Step,
    table: &str,
    where_clause: &str,
    output_fields: &[String],
    on_success: Option<&Branch>,
    on_failure: Option<&Branch>,
    recipe: &Recipe,
    context: &mut Context,
    probe: &dyn SqlProbe,
    cancellation: &CancellationToken,
    probe_deadline: Duration,
    trace: &mut Vec<TraceEntry>,
    clock: &dyn Clock,
) -> Transition {
    let empty_context = Context::new();
    let table = workorder_template::render(table, &empty_context, Mode::SqlIdentifier)
        .map_err(|err| engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone()))?;

    for field in output_fields {
        workorder_template::render(field, &empty_context, Mode::SqlIdentifier).map_err(|err| {
            engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone())
        })?;
    }

    let rendered_where = workorder_template::render(where_clause, context, Mode::SqlLiteral)
        .map_err(|err| engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone()))?;

    let sql = format!("SELECT {} FROM {} WHERE {}", output_fields.join(","), table, rendered_where);

    if cancellation.is_cancelled() {
        return Err(engine_error(
            EngineErrorKind::Cancelled,
            &format!("cancelled before step {}'s probe call", step.step),
            trace.clone(),
        ));
    }

    let probed = tokio::select! {
        biased;
        () = cancellation.cancelled() => {
            return Err(engine_error(
                EngineErrorKind::Cancelled,
                &format!("cancelled during step {}'s probe call", step.step),
                trace.clone(),
            ));
        }
        result = probe.probe(&sql, probe_deadline) => result,
    };

    let result: QueryResult = match probed {
        Ok(result) if result.row_count() > 0 => result,
        Ok(_) => return handle_query_failure(step, on_failure, trace, clock),
        Err(_) => return handle_query_failure(step, on_failure, trace, clock),
    };

    if result.row_count() > 1 {
        trace.push(TraceEntry {
            step: step.step,
            operation: OperationKind::Query,
            decision: StepDecision::AmbiguousRows { row_count: result.row_count() },
            at: clock.now(),
        });
    }

    for field in output_fields {
        let value = result.value(0, field).cloned().unwrap_or(Scalar::Null);
        context.set(field.clone(), value);
    }

    match on_success {
        None => {
            let next = step.step.checked_add(1).filter(|candidate| recipe.step(*candidate).is_some());
            trace.push(TraceEntry {
                step: step.step,
                operation: OperationKind::Query,
                decision: StepDecision::Advanced { to: next },
                at: clock.now(),
            });
            Ok(next)
        }
        Some(branch) => take_branch(step.step, OperationKind::Query, branch, context, trace, clock),
    }
}

fn handle_query_failure(step: &Step, on_failure: Option<&Branch>, trace: &mut Vec<TraceEntry>, clock: &dyn Clock) -> Transition {
    match on_failure {
        Some(branch) => {
            trace.push(TraceEntry {
                step: step.step,
                operation: OperationKind::Query,
                decision: StepDecision::FellBackOnFailure { to: branch.next_step.unwrap_or(step.step) },
                at: clock.now(),
            });
            Ok(branch.next_step)
        }
        None => Err(engine_error(
            EngineErrorKind::QueryFailed,
            &format!("step {}: query returned no rows and no on_failure branch is defined", step.step),
            trace.clone(),
        )),
    }
}

fn take_branch(
    step_number: u32,
    operation: OperationKind,
    branch: &Branch,
    context: &Context,
    trace: &mut Vec<TraceEntry>,
    clock: &dyn Clock,
) -> Transition {
    match &branch.condition {
        None => {
            trace.push(TraceEntry {
                step: step_number,
                operation,
                decision: StepDecision::Advanced { to: branch.next_step },
                at: clock.now(),
            });
            Ok(branch.next_step)
        }
        Some(condition) => {
            let truthy = workorder_expr::eval(condition, context).map_err(|err| {
                engine_error(EngineErrorKind::EvalError, &format!("step {}: {}", step_number, err), trace.clone())
            })?;
            let to = if truthy { branch.next_step } else { branch.else_step };
            trace.push(TraceEntry { step: step_number, operation, decision: StepDecision::BranchTaken { truthy, to }, at: clock.now() });
            Ok(to)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_generate_dml_step(
    step: &Step,
    table: &str,
    operation: &DmlOperation,
    next_step: Option<u32>,
    recipe: &Recipe,
    context: &Context,
    dml: &mut Vec<DmlRecord>,
    trace: &mut Vec<TraceEntry>,
    clock: &dyn Clock,
) -> Transition {
    let empty_context = Context::new();
    let rendered_table = workorder_template::render(table, &empty_context, Mode::SqlIdentifier)
        .map_err(|err| engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone()))?;

    let (kind, template_text) = match operation {
        DmlOperation::Update { set, where_clause } => {
            for column in set.keys() {
                workorder_template::render(column, &empty_context, Mode::SqlIdentifier).map_err(|err| {
                    engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone())
                })?;
            }
            let set_clause = set.iter().map(|(column, value)| format!("{} = {}", column, value)).collect::<Vec<_>>().join(", ");
            (DmlKind::Update, format!("UPDATE {} SET {} WHERE {}", rendered_table, set_clause, where_clause))
        }
        DmlOperation::Insert { values } => {
            for column in values.keys() {
                workorder_template::render(column, &empty_context, Mode::SqlIdentifier).map_err(|err| {
                    engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone())
                })?;
            }
            let columns = values.keys().cloned().collect::<Vec<_>>().join(", ");
            let placeholders = values.values().cloned().collect::<Vec<_>>().join(", ");
            (DmlKind::Insert, format!("INSERT INTO {} ({}) VALUES ({})", rendered_table, columns, placeholders))
        }
        DmlOperation::Delete { where_clause } => {
            (DmlKind::Delete, format!("DELETE FROM {} WHERE {}", rendered_table, where_clause))
        }
    };

    let rendered_sql = workorder_template::render(&template_text, context, Mode::SqlLiteral)
        .map_err(|err| engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone()))?;
    let (template_sql, parameters) = workorder_template::render_parameterized(&template_text, context)
        .map_err(|err| engine_error(EngineErrorKind::RenderError, &format!("step {}: {}", step.step, err), trace.clone()))?;

    dml.push(DmlRecord {
        kind,
        table: rendered_table.clone(),
        rendered_sql,
        template_sql,
        parameters,
        description: format!("{} {}", kind, rendered_table),
    });

    trace.push(TraceEntry { step: step.step, operation: OperationKind::GenerateDml, decision: StepDecision::DmlAppended, at: clock.now() });

    let next = next_step.or_else(|| step.step.checked_add(1).filter(|candidate| recipe.step(*candidate).is_some()));
    Ok(next)
}
