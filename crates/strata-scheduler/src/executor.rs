//! Level execution with a barrier.
//!
//! Every ready invocation of a level runs in its own task. The executor
//! returns only once each of them has a terminal outcome, or once the level
//! is interrupted by cancellation or the batch deadline.

use crate::config::ExecuteOptions;
use crate::propagate::ReadyInvocation;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use strata_core::{CancellationToken, ExecutionRequest, FailureKind, Outcome, ToolExecutor};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcomes of one level run.
#[derive(Debug, Default)]
pub struct LevelRun {
    /// Outcome per submission index, one for every ready invocation
    pub outcomes: HashMap<usize, Outcome>,
    /// Whether cancellation or the deadline cut the level short
    pub interrupted: bool,
}

/// Runs the ready invocations of one level concurrently.
#[derive(Debug, Clone)]
pub struct LevelExecutor {
    per_invocation_timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    cancellation_grace: Duration,
}

impl LevelExecutor {
    pub fn new(options: &ExecuteOptions) -> Self {
        Self {
            per_invocation_timeout: options.per_invocation_timeout,
            max_concurrency: options.max_concurrency_per_level.map(|limit| limit.get()),
            cancellation_grace: options.cancellation_grace,
        }
    }

    /// Run `ready` to completion.
    ///
    /// At most `max_concurrency` executor calls are in flight at once. If
    /// `cancel` fires or `deadline` passes first, in-flight calls are
    /// signalled through their tokens and given the cancellation grace
    /// period to return; every invocation that had not resolved by the
    /// interruption is recorded as cancelled.
    pub async fn run(
        &self,
        ready: Vec<ReadyInvocation>,
        executor: Arc<dyn ToolExecutor>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> LevelRun {
        let mut run = LevelRun::default();
        if ready.is_empty() {
            return run;
        }

        let permits = self
            .max_concurrency
            .map_or(ready.len(), |limit| limit.min(ready.len()))
            .max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        let level_token = cancel.child_token();
        let indices: Vec<usize> = ready.iter().map(|invocation| invocation.index).collect();

        debug!(
            invocations = ready.len(),
            permits, "Starting level execution"
        );

        let mut workers = JoinSet::new();
        for invocation in ready {
            let worker = Worker {
                index: invocation.index,
                request: invocation.request,
                executor: Arc::clone(&executor),
                semaphore: Arc::clone(&semaphore),
                cancel: level_token.child_token(),
                timeout: self.per_invocation_timeout,
            };
            workers.spawn(worker.run());
        }

        loop {
            tokio::select! {
                biased;
                _ = level_token.cancelled() => {
                    run.interrupted = true;
                    break;
                }
                _ = deadline_reached(deadline) => {
                    warn!("Batch deadline reached during level execution");
                    run.interrupted = true;
                    break;
                }
                joined = workers.join_next() => match joined {
                    Some(Ok((index, outcome))) => {
                        run.outcomes.insert(index, outcome);
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "Level worker did not complete");
                    }
                    None => break,
                },
            }
        }

        if run.interrupted {
            level_token.cancel();
            let drained = tokio::time::timeout(self.cancellation_grace, async {
                while workers.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(
                    in_flight = workers.len(),
                    grace = %humantime::format_duration(self.cancellation_grace),
                    "Aborting invocations that ignored cancellation"
                );
                workers.abort_all();
            }
        }

        for index in indices {
            run.outcomes.entry(index).or_insert_with(Outcome::cancelled);
        }

        debug!(
            resolved = run.outcomes.len(),
            interrupted = run.interrupted,
            "Level execution finished"
        );
        run
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

struct Worker {
    index: usize,
    request: ExecutionRequest,
    executor: Arc<dyn ToolExecutor>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl Worker {
    async fn run(self) -> (usize, Outcome) {
        let index = self.index;
        let id = self.request.invocation_id.clone();

        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return (index, Outcome::cancelled()),
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return (index, Outcome::cancelled()),
            },
        };
        if self.cancel.is_cancelled() {
            return (index, Outcome::cancelled());
        }

        let call = AssertUnwindSafe(self.executor.execute(self.request, self.cancel.clone()))
            .catch_unwind();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    self.cancel.cancel();
                    let limit = humantime::format_duration(limit);
                    warn!(invocation = %id, timeout = %limit, "Invocation timed out");
                    return (
                        index,
                        Outcome::failure(FailureKind::Timeout, format!("timed out after {limit}")),
                    );
                }
            },
            None => call.await,
        };

        let outcome = match result {
            Ok(Ok(value)) => Outcome::success(value),
            Ok(Err(failure)) => {
                warn!(invocation = %id, error = %failure, "Invocation failed");
                Outcome::failure(FailureKind::Execution, failure.message)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(invocation = %id, panic = %message, "Executor panicked");
                Outcome::failure(
                    FailureKind::Execution,
                    format!("executor panicked: {message}"),
                )
            }
        };
        (index, outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
