//! Concurrent fan-out of one query to a batch of workers
//!
//! Every worker runs in its own Tokio task. A failing, panicking or slow
//! worker only loses its own slot; the rest of the batch is unaffected.
//! One deadline covers the whole fan-out and anything still running when
//! it passes is aborted and recorded as a timeout.

use crate::types::{AppError, FailureReason, Result, WorkerFailure, WorkerResponse};
use crate::workers::WorkerBatch;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

/// Settings for the fan-out stage
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Shared deadline for the whole batch
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// Everything one fan-out produced, in batch order
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub responses: Vec<WorkerResponse>,
    pub failures: Vec<WorkerFailure>,
}

type Outcome = std::result::Result<Result<WorkerResponse>, Box<dyn Any + Send>>;

pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run every worker in `batch` against `query` and keep the valid answers
    ///
    /// Fails with [`AppError::NoValidResponses`] when the batch is empty or no
    /// worker produced non-empty content.
    pub async fn dispatch(&self, batch: &WorkerBatch, query: &str) -> Result<Vec<WorkerResponse>> {
        self.dispatch_detailed(batch, query)
            .await
            .map(|report| report.responses)
    }

    /// Like [`dispatch`](Self::dispatch) but also returns per-worker failures
    pub async fn dispatch_detailed(&self, batch: &WorkerBatch, query: &str) -> Result<DispatchReport> {
        if batch.is_empty() {
            tracing::warn!("Dispatch requested with an empty worker batch");
            return Err(AppError::NoValidResponses);
        }

        let deadline = Instant::now() + self.config.timeout;
        let query: Arc<str> = Arc::from(query);
        let mut set = JoinSet::new();
        let mut slot_of = HashMap::with_capacity(batch.len());

        for (index, (key, worker)) in batch.iter().enumerate() {
            let worker = Arc::clone(worker);
            let query = Arc::clone(&query);
            let key = key.clone();

            let handle = set.spawn(async move {
                let started = std::time::Instant::now();
                let outcome: Outcome = AssertUnwindSafe(worker.produce(&query))
                    .catch_unwind()
                    .await;
                tracing::debug!(
                    worker = %key,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Worker finished"
                );
                outcome
            });
            slot_of.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<Outcome>> = (0..batch.len()).map(|_| None).collect();

        loop {
            match tokio::time::timeout_at(deadline, set.join_next_with_id()).await {
                Ok(Some(Ok((id, outcome)))) => {
                    if let Some(&index) = slot_of.get(&id) {
                        slots[index] = Some(outcome);
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "Worker task failed to join");
                    if let Some(&index) = slot_of.get(&e.id()) {
                        slots[index] = Some(join_failure(e));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = set.len(),
                        timeout_ms = self.config.timeout.as_millis() as u64,
                        "Dispatch deadline reached, cancelling pending workers"
                    );
                    set.abort_all();
                    break;
                }
            }
        }

        let mut report = DispatchReport::default();

        for ((key, worker), slot) in batch.iter().zip(slots) {
            let reason = match slot {
                Some(Ok(Ok(response))) if response.is_valid() => {
                    report.responses.push(response);
                    continue;
                }
                Some(Ok(Ok(_))) => FailureReason::EmptyContent,
                Some(Ok(Err(e))) => FailureReason::Error(e.to_string()),
                Some(Err(payload)) => FailureReason::Panicked(panic_message(payload.as_ref())),
                None => FailureReason::Timeout,
            };

            tracing::warn!(
                worker = %key,
                perspective = worker.perspective(),
                reason = %reason,
                "Worker produced no usable response"
            );
            report.failures.push(WorkerFailure {
                worker: key.clone(),
                perspective: worker.perspective().to_string(),
                reason,
            });
        }

        if report.responses.is_empty() {
            tracing::error!(
                failed = report.failures.len(),
                "No worker produced a valid response"
            );
            return Err(AppError::NoValidResponses);
        }

        tracing::info!(
            succeeded = report.responses.len(),
            failed = report.failures.len(),
            "Dispatch complete"
        );

        Ok(report)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

/// Outcome for a task that ended without handing back its result
fn join_failure(error: JoinError) -> Outcome {
    match error.try_into_panic() {
        Ok(payload) => Err(payload),
        Err(error) => Ok(Err(AppError::Internal(format!(
            "worker task did not complete: {}",
            error
        )))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
