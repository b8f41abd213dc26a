//! Mock implementations for testing.
//!
//! Scripted LLM clients and orchestrator builders shared by the
//! integration test files.

use async_trait::async_trait;
use parking_lot::Mutex;
use parley::llm::LLMClient;
use parley::orchestration::{
    DispatchConfig, Dispatcher, Orchestrator, PerspectiveRouter, SynthesisConfig, Synthesizer,
};
use parley::types::{AppError, Result};
use parley::workers::{register_perspective, CachePolicy, WorkerFactory, WorkerRegistry};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Sleep for the duration, then answer
    Slow(Duration, String),
    Fail(String),
    Panic,
}

/// Mock LLM client for testing with scripted responses.
///
/// Replies are consumed in order; once the script runs out every call gets
/// the fallback reply. Each call is counted and its prompts recorded.
///
/// ```ignore
/// let client = MockLLMClient::new("Hello, world!");
/// let client = MockLLMClient::scripted(vec![Reply::Fail("bad".into()), Reply::Text("ok".into())]);
/// let client = MockLLMClient::failing();
/// ```
pub struct MockLLMClient {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, String)>>,
}

impl MockLLMClient {
    /// Client that always returns `response`.
    pub fn new(response: &str) -> Self {
        Self::with_fallback(Vec::new(), Reply::Text(response.to_string()))
    }

    /// Client that plays `script` and then fails every further call.
    pub fn scripted(script: Vec<Reply>) -> Self {
        Self::with_fallback(script, Reply::Fail("script exhausted".to_string()))
    }

    /// Client that always returns an error.
    pub fn failing() -> Self {
        Self::with_fallback(Vec::new(), Reply::Fail("Mock LLM failure".to_string()))
    }

    /// Client that panics on every call.
    pub fn panicking() -> Self {
        Self::with_fallback(Vec::new(), Reply::Panic)
    }

    fn with_fallback(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (system, prompt) pairs in call order
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().clone()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn respond(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .push((system.to_string(), prompt.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Reply::Fail(msg) => Err(AppError::LLM(msg)),
            Reply::Panic => panic!("mock LLM panicked"),
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.respond(system, prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Valid mediator JSON for the given labels.
pub fn aggregate_json(summary: &str, conflicts: &str, perspectives: &[&str]) -> String {
    serde_json::json!({
        "summary": summary,
        "conflicts": conflicts,
        "perspectives": perspectives,
    })
    .to_string()
}

/// Perspective worker definition for [`build_orchestrator`].
pub struct TestPerspective {
    pub key: &'static str,
    pub label: &'static str,
    pub llm: Arc<MockLLMClient>,
}

impl TestPerspective {
    pub fn new(key: &'static str, label: &'static str, llm: Arc<MockLLMClient>) -> Self {
        Self { key, label, llm }
    }
}

/// Options for [`build_orchestrator`].
pub struct TestPipeline {
    pub dispatch_timeout: Duration,
    pub synthesis_timeout: Duration,
    pub routing: bool,
}

impl Default for TestPipeline {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(5),
            synthesis_timeout: Duration::from_secs(5),
            routing: false,
        }
    }
}

/// Build an orchestrator over mock-backed perspective workers.
pub fn build_orchestrator(
    perspectives: Vec<TestPerspective>,
    mediator: Arc<MockLLMClient>,
    pipeline: TestPipeline,
) -> Orchestrator {
    let registry = Arc::new(WorkerRegistry::new());
    for p in perspectives {
        register_perspective(&registry, p.key, p.label, None, p.llm)
            .expect("perspective registration");
    }

    let factory = Arc::new(WorkerFactory::with_policy(
        Arc::clone(&registry),
        CachePolicy::Cached,
    ));

    let orchestrator = Orchestrator::new(
        factory,
        Dispatcher::new(DispatchConfig {
            timeout: pipeline.dispatch_timeout,
        }),
        Synthesizer::new(
            mediator.clone(),
            SynthesisConfig {
                strict_timeout: pipeline.synthesis_timeout,
                fallback_timeout: pipeline.synthesis_timeout,
            },
        ),
    );

    if pipeline.routing {
        orchestrator.with_router(PerspectiveRouter::new(mediator, registry))
    } else {
        orchestrator
    }
}

/// The three built-in viewpoints, each answering with a fixed text.
pub fn three_perspectives() -> Vec<TestPerspective> {
    vec![
        TestPerspective::new(
            "conservative",
            "Conservative",
            MockLLMClient::new("Keep fares; cut waste.").into_arc(),
        ),
        TestPerspective::new(
            "liberal",
            "Liberal",
            MockLLMClient::new("Subsidize fares for low incomes.").into_arc(),
        ),
        TestPerspective::new(
            "socialist",
            "Socialist",
            MockLLMClient::new("Make transit free and public.").into_arc(),
        ),
    ]
}
