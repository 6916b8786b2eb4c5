//! Batch orchestration.
//!
//! The [`Scheduler`] validates a batch (graph build and leveling) before any
//! side effect, then runs it level by level: propagate prior results into the
//! next level, execute it behind a barrier, merge the outcomes. Results come
//! back in submission order.

use crate::config::ExecuteOptions;
use crate::executor::LevelExecutor;
use crate::graph::DependencyGraph;
use crate::level::{ExecutionPlan, level};
use crate::propagate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strata_core::{
    CancellationToken, InvocationId, InvocationResult, InvocationSpec, InvocationStatus, Outcome,
    StructuralResult, ToolExecutor,
};
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, trace, warn};
use uuid::Uuid;

/// Full record of one `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Correlation id, also recorded on the `batch` tracing span
    pub batch_id: Uuid,
    /// One result per invocation, in submission order
    pub results: Vec<InvocationResult>,
    /// The levels the batch was scheduled in
    pub levels: Vec<Vec<InvocationId>>,
    /// Wall-clock time spent
    #[serde(with = "crate::duration")]
    pub elapsed: Duration,
    /// Whether cancellation or the batch timeout cut the batch short
    pub cancelled: bool,
}

/// Outcome counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn summary(&self) -> BatchSummary {
        summarize(&self.results)
    }
}

fn summarize(results: &[InvocationResult]) -> BatchSummary {
    results.iter().fold(
        BatchSummary {
            total: results.len(),
            ..BatchSummary::default()
        },
        |mut summary, result| {
            match result.outcome {
                Outcome::Success { .. } => summary.succeeded += 1,
                Outcome::Failure { .. } => summary.failed += 1,
                Outcome::Skipped { .. } => summary.skipped += 1,
            }
            summary
        },
    )
}

/// Dependency-aware batch scheduler.
///
/// # Example
///
/// ```rust
/// use strata_core::{InvocationSpec, ToolFailure, executor_fn};
/// use strata_scheduler::Scheduler;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let batch = vec![
///     InvocationSpec::builder().id("a").target("one").build().unwrap(),
///     InvocationSpec::builder().id("b").target("double").reference("x", "a").build().unwrap(),
/// ];
///
/// let executor = executor_fn(|request, _cancel| async move {
///     match request.target.as_str() {
///         "one" => Ok(json!(1)),
///         "double" => Ok(json!(request.argument("x").and_then(|v| v.as_i64()).unwrap_or(0) * 2)),
///         other => Err(ToolFailure::new(format!("unknown target {other}"))),
///     }
/// });
///
/// let results = Scheduler::default().execute(&batch, executor).await.unwrap();
/// assert_eq!(results[1].output(), Some(&json!(2)));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    options: ExecuteOptions,
}

impl Scheduler {
    pub fn new(options: ExecuteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecuteOptions {
        &self.options
    }

    /// Validate and level a batch without executing anything.
    pub fn plan(&self, invocations: &[InvocationSpec]) -> StructuralResult<ExecutionPlan> {
        let graph = DependencyGraph::build(invocations)?;
        let levels = level(&graph)?;
        Ok(ExecutionPlan {
            levels: levels.to_ids(&graph),
        })
    }

    /// Execute a batch and return one result per invocation, in submission
    /// order.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`](strata_core::StructuralError) if the
    /// batch has duplicate ids, unknown or self dependencies, or a cycle. The
    /// executor is never called in that case.
    pub async fn execute<E>(
        &self,
        invocations: &[InvocationSpec],
        executor: E,
    ) -> StructuralResult<Vec<InvocationResult>>
    where
        E: ToolExecutor + 'static,
    {
        self.execute_with_cancellation(invocations, executor, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), stopping early once `cancel` fires.
    ///
    /// Results already recorded are kept; everything else is skipped with
    /// reason `"batch cancelled"`.
    pub async fn execute_with_cancellation<E>(
        &self,
        invocations: &[InvocationSpec],
        executor: E,
        cancel: CancellationToken,
    ) -> StructuralResult<Vec<InvocationResult>>
    where
        E: ToolExecutor + 'static,
    {
        Ok(self
            .execute_detailed(invocations, executor, cancel)
            .await?
            .results)
    }

    /// Execute a batch and return the full [`BatchReport`].
    pub async fn execute_detailed<E>(
        &self,
        invocations: &[InvocationSpec],
        executor: E,
        cancel: CancellationToken,
    ) -> StructuralResult<BatchReport>
    where
        E: ToolExecutor + 'static,
    {
        let graph = DependencyGraph::build(invocations)?;
        let levels = level(&graph)?;

        let batch_id = Uuid::new_v4();
        let span = info_span!(
            "batch",
            %batch_id,
            invocations = invocations.len(),
            levels = levels.len()
        );

        let executor: Arc<dyn ToolExecutor> = Arc::new(executor);
        let started = Instant::now();
        let deadline = self.options.batch_timeout.map(|timeout| started + timeout);
        let token = cancel.child_token();
        let level_executor = LevelExecutor::new(&self.options);

        async {
            let mut batch = Batch::new(&graph);
            let mut cancelled = false;

            for (depth, level) in levels.iter().enumerate() {
                if token.is_cancelled() || deadline.is_some_and(|at| Instant::now() >= at) {
                    warn!(
                        level = depth,
                        "Batch interrupted, remaining levels will not start"
                    );
                    cancelled = true;
                    break;
                }

                let prepared = propagate::prepare(level, &graph, invocations, &batch.outcomes);
                debug!(
                    level = depth,
                    ready = prepared.ready.len(),
                    resolved = prepared.resolved.len(),
                    "Level prepared"
                );

                for (idx, outcome) in prepared.resolved {
                    if outcome.is_failure() {
                        batch.transition(idx, InvocationStatus::Ready);
                    }
                    batch.record(idx, outcome);
                }
                for ready in &prepared.ready {
                    batch.transition(ready.index, InvocationStatus::Ready);
                    batch.transition(ready.index, InvocationStatus::Running);
                }

                let run = level_executor
                    .run(prepared.ready, Arc::clone(&executor), &token, deadline)
                    .await;
                for (idx, outcome) in run.outcomes {
                    batch.record(idx, outcome);
                }

                if run.interrupted {
                    warn!(level = depth, "Batch interrupted during level execution");
                    cancelled = true;
                    break;
                }
            }

            batch.cancel_unresolved();
            let results = batch.into_results();
            let elapsed = started.elapsed();
            let summary = summarize(&results);
            info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                skipped = summary.skipped,
                cancelled,
                elapsed = %humantime::format_duration(elapsed),
                "Batch finished"
            );

            Ok(BatchReport {
                batch_id,
                results,
                levels: levels.to_ids(&graph),
                elapsed,
                cancelled,
            })
        }
        .instrument(span)
        .await
    }
}

/// Execute a batch with the given options.
///
/// Shorthand for `Scheduler::new(options.clone()).execute(..)`.
pub async fn execute<E>(
    invocations: &[InvocationSpec],
    executor: E,
    options: &ExecuteOptions,
) -> StructuralResult<Vec<InvocationResult>>
where
    E: ToolExecutor + 'static,
{
    Scheduler::new(options.clone())
        .execute(invocations, executor)
        .await
}

/// Per-call state, owned by the orchestrator and mutated only between levels.
struct Batch<'a> {
    graph: &'a DependencyGraph,
    statuses: Vec<InvocationStatus>,
    outcomes: Vec<Option<Outcome>>,
}

impl<'a> Batch<'a> {
    fn new(graph: &'a DependencyGraph) -> Self {
        Self {
            graph,
            statuses: vec![InvocationStatus::Pending; graph.len()],
            outcomes: vec![None; graph.len()],
        }
    }

    fn transition(&mut self, idx: usize, next: InvocationStatus) {
        let current = self.statuses[idx];
        let invocation = self.graph.id(idx);
        if current.can_transition_to(next) {
            trace!(%invocation, from = %current, to = %next, "Status transition");
            self.statuses[idx] = next;
        } else {
            warn!(%invocation, from = %current, to = %next, "Ignoring invalid status transition");
        }
    }

    fn record(&mut self, idx: usize, outcome: Outcome) {
        let status = match outcome {
            Outcome::Success { .. } => InvocationStatus::Succeeded,
            Outcome::Failure { .. } => InvocationStatus::Failed,
            Outcome::Skipped { .. } => InvocationStatus::Skipped,
        };
        self.transition(idx, status);
        self.outcomes[idx] = Some(outcome);
    }

    fn cancel_unresolved(&mut self) {
        for idx in 0..self.outcomes.len() {
            if self.outcomes[idx].is_none() {
                self.record(idx, Outcome::cancelled());
            }
        }
    }

    fn into_results(self) -> Vec<InvocationResult> {
        let graph = self.graph;
        self.outcomes
            .into_iter()
            .enumerate()
            .map(|(idx, outcome)| {
                InvocationResult::new(
                    graph.id(idx).clone(),
                    outcome.unwrap_or_else(Outcome::cancelled),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{StructuralError, ToolFailure, executor_fn};

    fn spec(name: &str, deps: &[&str]) -> InvocationSpec {
        deps.iter()
            .fold(InvocationSpec::builder().id(name).target("noop"), |b, d| {
                b.depends_on(d)
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_plan() {
        let plan = Scheduler::default()
            .plan(&[spec("a", &[]), spec("b", &["a"]), spec("c", &[])])
            .unwrap();
        let names: Vec<Vec<&str>> = plan
            .levels
            .iter()
            .map(|l| l.iter().map(InvocationId::as_str).collect())
            .collect();
        assert_eq!(names, vec![vec!["a", "c"], vec!["b"]]);
        assert_eq!(plan.invocation_count(), 3);
    }

    #[test]
    fn test_plan_reports_structural_errors() {
        let err = Scheduler::default()
            .plan(&[spec("a", &["b"]), spec("b", &["a"])])
            .unwrap_err();
        assert_eq!(err.code(), "dependency_cycle");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = Scheduler::default()
            .execute(&[], executor_fn(|_, _| async { Ok(json!(null)) }))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_report_summary() {
        let batch = [spec("a", &[]), spec("b", &[]), spec("c", &["b"])];
        let executor = executor_fn(|request, _| async move {
            if request.invocation_id.as_str() == "b" {
                Err(ToolFailure::new("no"))
            } else {
                Ok(json!(true))
            }
        });

        let report = Scheduler::default()
            .execute_detailed(&batch, executor, CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.levels.len(), 2);
        assert_eq!(
            report.summary(),
            BatchSummary {
                total: 3,
                succeeded: 1,
                failed: 1,
                skipped: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_structural_error_before_execution() {
        let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let executor = executor_fn(move |_, _| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            async { Ok(json!(null)) }
        });

        let err = execute(&[spec("x", &["y"])], executor, &ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StructuralError::UnknownDependency { .. }));
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let report = Scheduler::default()
            .execute_detailed(
                &[spec("a", &[]), spec("b", &["a"])],
                executor_fn(|_, _| async { Ok(json!(1)) }),
                token,
            )
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report
            .results
            .iter()
            .all(|r| r.skip_reason() == Some(strata_core::BATCH_CANCELLED)));
    }
}
