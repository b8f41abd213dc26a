//! End-to-end deliberation: factory, dispatcher, synthesizer

use crate::orchestration::{Dispatcher, PerspectiveRouter, Synthesizer};
use crate::types::{AggregateResult, AppError, Deliberation, Result};
use crate::workers::WorkerFactory;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Composes the pipeline stages for one query at a time
///
/// Holds no per-request state, so one instance is shared across all
/// concurrent requests.
pub struct Orchestrator {
    factory: Arc<WorkerFactory>,
    dispatcher: Dispatcher,
    synthesizer: Synthesizer,
    router: Option<PerspectiveRouter>,
}

impl Orchestrator {
    pub fn new(factory: Arc<WorkerFactory>, dispatcher: Dispatcher, synthesizer: Synthesizer) -> Self {
        Self {
            factory,
            dispatcher,
            synthesizer,
            router: None,
        }
    }

    /// Enable model-driven perspective selection for [`route_and_run`](Self::route_and_run)
    pub fn with_router(mut self, router: PerspectiveRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn factory(&self) -> &Arc<WorkerFactory> {
        &self.factory
    }

    pub fn has_router(&self) -> bool {
        self.router.is_some()
    }

    /// Answer `query` with the workers named by `worker_keys`
    ///
    /// Unknown keys are skipped. Fails with `NoValidResponses` when no
    /// selected worker answers and `SynthesisFailed` when the answers cannot
    /// be merged.
    pub async fn run<S: AsRef<str>>(&self, query: &str, worker_keys: &[S]) -> Result<AggregateResult> {
        self.run_detailed(query, worker_keys).await.map(|d| d.result)
    }

    /// Like [`run`](Self::run), returning the full [`Deliberation`] record
    pub async fn run_detailed<S: AsRef<str>>(
        &self,
        query: &str,
        worker_keys: &[S],
    ) -> Result<Deliberation> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }

        let trace_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = std::time::Instant::now();

        let batch = self.factory.create_batch(worker_keys);
        tracing::info!(
            trace_id = %trace_id,
            requested = worker_keys.len(),
            workers = ?batch.keys(),
            "Starting deliberation"
        );

        let report = self
            .dispatcher
            .dispatch_detailed(&batch, query)
            .await
            .map_err(|e| {
                tracing::error!(trace_id = %trace_id, error = %e, "Deliberation failed during dispatch");
                e
            })?;

        let synthesis = self
            .synthesizer
            .synthesize_detailed(query, &report.responses)
            .await
            .map_err(|e| {
                tracing::error!(trace_id = %trace_id, error = %e, "Deliberation failed during synthesis");
                e
            })?;

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            trace_id = %trace_id,
            duration_ms,
            path = synthesis.path.as_str(),
            corrected = synthesis.corrected,
            failed = report.failures.len(),
            "Deliberation complete"
        );

        Ok(Deliberation {
            trace_id,
            query: query.to_string(),
            result: synthesis.result,
            responses: report.responses,
            failures: report.failures,
            synthesis_path: synthesis.path,
            corrected: synthesis.corrected,
            started_at,
            duration_ms,
        })
    }

    /// Let the router pick perspectives, then deliberate
    ///
    /// Without a router every registered perspective answers.
    pub async fn route_and_run(&self, query: &str) -> Result<Deliberation> {
        let keys = match &self.router {
            Some(router) => router.select(query).await,
            None => self.factory.registry().keys(),
        };
        self.run_detailed(query, &keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMClient;
    use crate::orchestration::{DispatchConfig, SynthesisConfig};
    use crate::types::{SynthesisPath, WorkerResponse};
    use crate::workers::{Worker, WorkerRegistry};
    use async_trait::async_trait;

    struct Canned {
        perspective: &'static str,
        content: &'static str,
    }

    #[async_trait]
    impl Worker for Canned {
        fn perspective(&self) -> &str {
            self.perspective
        }

        async fn produce(&self, _query: &str) -> Result<WorkerResponse> {
            Ok(WorkerResponse::new(self.perspective, self.content))
        }
    }

    struct Mediator(&'static str);

    #[async_trait]
    impl LLMClient for Mediator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "mediator"
        }
    }

    fn orchestrator(workers: &[(&'static str, &'static str, &'static str)], reply: &'static str) -> Orchestrator {
        let registry = WorkerRegistry::new();
        for (key, perspective, content) in workers.iter().copied() {
            registry
                .register_fn(key, move || {
                    Ok(Arc::new(Canned {
                        perspective,
                        content,
                    }) as Arc<dyn Worker>)
                })
                .unwrap();
        }
        let factory = Arc::new(WorkerFactory::new(Arc::new(registry)));
        Orchestrator::new(
            factory,
            Dispatcher::new(DispatchConfig::default()),
            Synthesizer::new(Arc::new(Mediator(reply)), SynthesisConfig::default()),
        )
    }

    const THREE: &[(&str, &str, &str)] = &[
        ("conservative", "Conservative", "Keep taxes low."),
        ("liberal", "Liberal", "Fund public services."),
        ("socialist", "Socialist", "Redistribute wealth."),
    ];

    #[tokio::test]
    async fn test_three_perspectives_corrected() {
        let orchestrator = orchestrator(
            THREE,
            r#"{"summary": "They differ on taxes.", "conflicts": "Tax levels.", "perspectives": ["Conservative"]}"#,
        );

        let result = orchestrator
            .run("How should taxes change?", &["conservative", "liberal", "socialist"])
            .await
            .unwrap();
        assert_eq!(result.perspectives, vec!["Conservative", "Liberal", "Socialist"]);
        assert_eq!(result.summary, "They differ on taxes.");
    }

    #[tokio::test]
    async fn test_run_detailed_records_metadata() {
        let orchestrator = orchestrator(
            &[("x", "X", "foo"), ("y", "Y", "")],
            r#"{"summary": "foo", "conflicts": "", "perspectives": ["X"]}"#,
        );

        let deliberation = orchestrator
            .run_detailed("  q  ", &["x", "y", "missing"])
            .await
            .unwrap();
        assert_eq!(deliberation.query, "q");
        assert_eq!(deliberation.responses, vec![WorkerResponse::new("X", "foo")]);
        assert_eq!(deliberation.failures.len(), 1);
        assert_eq!(deliberation.failures[0].worker, "y");
        assert_eq!(deliberation.synthesis_path, SynthesisPath::Strict);
        assert!(!deliberation.corrected);
        assert_eq!(deliberation.result.perspectives, vec!["X"]);
    }

    #[tokio::test]
    async fn test_no_workers_is_no_valid_responses() {
        let orchestrator = orchestrator(THREE, "{}");
        let keys: Vec<String> = Vec::new();
        let result = orchestrator.run("q", &keys).await;
        assert!(matches!(result, Err(AppError::NoValidResponses)));
    }

    #[tokio::test]
    async fn test_only_unknown_keys_is_no_valid_responses() {
        let orchestrator = orchestrator(THREE, "{}");
        let result = orchestrator.run("q", &["green", "pirate"]).await;
        assert!(matches!(result, Err(AppError::NoValidResponses)));
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let orchestrator = orchestrator(THREE, "{}");
        let result = orchestrator.run("   ", &["liberal"]).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unusable_synthesis_is_synthesis_failed() {
        let orchestrator = orchestrator(THREE, "I refuse to answer in JSON.");
        let result = orchestrator.run("q", &["liberal"]).await;
        assert!(matches!(result, Err(AppError::SynthesisFailed(_))));
    }

    #[tokio::test]
    async fn test_route_and_run_without_router_uses_everyone() {
        let orchestrator = orchestrator(
            THREE,
            r#"{"summary": "s", "conflicts": "", "perspectives": []}"#,
        );
        assert!(!orchestrator.has_router());

        let deliberation = orchestrator.route_and_run("q").await.unwrap();
        assert_eq!(deliberation.responses.len(), 3);
        assert!(deliberation.corrected);
    }

    #[tokio::test]
    async fn test_route_and_run_with_router() {
        let base = orchestrator(
            THREE,
            r#"{"summary": "s", "conflicts": "", "perspectives": ["Liberal"]}"#,
        );
        let router = PerspectiveRouter::new(
            Arc::new(Mediator(r#"{"agents_to_invoke": ["liberal"]}"#)),
            Arc::clone(base.factory().registry()),
        );
        let orchestrator = base.with_router(router);

        let deliberation = orchestrator.route_and_run("q").await.unwrap();
        assert_eq!(deliberation.responses, vec![WorkerResponse::new("Liberal", "Fund public services.")]);
        assert_eq!(deliberation.result.perspectives, vec!["Liberal"]);
        assert!(!deliberation.corrected);
    }
}
