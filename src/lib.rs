//! # Parley - multi-perspective deliberation server
//!
//! Parley sends one question to several independent "perspective" workers at
//! once, collects their answers, and asks a mediator model to merge them into
//! a single structured result: a neutral summary, the conflicts between the
//! perspectives, and the list of perspectives that contributed.
//!
//! ## Overview
//!
//! Parley can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `parley` binary
//! 2. **As a library** - Embed the engine in your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use parley::orchestration::{Dispatcher, Orchestrator, SynthesisConfig, Synthesizer};
//! use parley::workers::{register_builtin_workers, WorkerFactory, WorkerRegistry};
//! use parley::{LLMClient, ModelParams, Provider};
//! use std::sync::Arc;
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//!     params: ModelParams::default(),
//! };
//! let llm: Arc<dyn LLMClient> = Arc::from(provider.create_client().await?);
//!
//! let registry = Arc::new(WorkerRegistry::new());
//! register_builtin_workers(&registry, Arc::clone(&llm))?;
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(WorkerFactory::new(registry)),
//!     Dispatcher::default(),
//!     Synthesizer::new(llm, SynthesisConfig::default()),
//! );
//! let result = orchestrator
//!     .run("Should public transport be free?", &["conservative", "liberal", "socialist"])
//!     .await?;
//! println!("{}", result.summary);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support |
//! | `swagger-ui` | Interactive API documentation at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`workers`] - Worker trait, registry and factory
//! - [`orchestration`] - Dispatch, synthesis, routing and the orchestrator
//! - [`llm`] - LLM client implementations
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration loading

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Dispatch, synthesis and orchestration of perspective workers.
pub mod orchestration;
/// Core types (responses, results, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Perspective workers, their registry and factory.
pub mod workers;

// Re-export commonly used types
pub use llm::{LLMClient, ModelParams, Provider};
pub use orchestration::{Dispatcher, Orchestrator, PerspectiveRouter, Synthesizer};
pub use types::{AggregateResult, AppError, Deliberation, Result, WorkerResponse};
pub use utils::toml_config::{ConfigError, ParleyConfig};
pub use workers::{Worker, WorkerFactory, WorkerRegistry};

use crate::workers::{register_perspective, CachePolicy};
use std::collections::HashMap;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Deliberation pipeline shared by every request
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Build the full pipeline from configuration
    ///
    /// One LLM client is created per referenced model and shared by every
    /// perspective using it.
    pub async fn from_config(config: &ParleyConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(build_orchestrator(config).await?)))
    }
}

/// Wire registry, factory, dispatcher, synthesizer and router from configuration
pub async fn build_orchestrator(config: &ParleyConfig) -> Result<Orchestrator> {
    let perspectives = config.enabled_perspectives();

    let mut model_names: Vec<&str> = perspectives.iter().map(|(_, p)| p.model.as_str()).collect();
    model_names.push(config.mediator.model.as_str());

    let mut clients: HashMap<String, Arc<dyn LLMClient>> = HashMap::new();
    for name in model_names {
        if clients.contains_key(name) {
            continue;
        }
        let provider = config.provider_for_model(name)?;
        tracing::info!(
            model = name,
            provider = provider.name(),
            target_model = provider.model(),
            "Creating LLM client"
        );
        let client: Arc<dyn LLMClient> = Arc::from(provider.create_client().await?);
        clients.insert(name.to_string(), client);
    }

    let client_for = |name: &str| -> Result<Arc<dyn LLMClient>> {
        clients
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::Configuration(format!("No client for model '{}'", name)))
    };

    let registry = Arc::new(WorkerRegistry::new());
    for (key, perspective) in &perspectives {
        register_perspective(
            &registry,
            key,
            &perspective.label,
            perspective.system_prompt.clone(),
            client_for(&perspective.model)?,
        )?;
    }
    tracing::info!(perspectives = ?registry.keys(), "Registered perspective workers");

    let mediator = client_for(&config.mediator.model)?;
    let factory = Arc::new(WorkerFactory::with_policy(
        Arc::clone(&registry),
        CachePolicy::Cached,
    ));

    let orchestrator = Orchestrator::new(
        factory,
        Dispatcher::new(config.dispatch_config()),
        Synthesizer::new(Arc::clone(&mediator), config.synthesis_config()),
    );

    Ok(if config.mediator.routing {
        orchestrator.with_router(PerspectiveRouter::new(mediator, registry))
    } else {
        orchestrator
    })
}
