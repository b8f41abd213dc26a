//! LLM-backed perspective workers and the built-in perspective set

use crate::llm::LLMClient;
use crate::types::{AppError, Result, WorkerResponse};
use crate::workers::{Worker, WorkerRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// `(key, label)` for every perspective registered by [`register_builtin_workers`]
pub const BUILTIN_PERSPECTIVES: &[(&str, &str)] = &[
    ("conservative", "Conservative"),
    ("liberal", "Liberal"),
    ("socialist", "Socialist"),
];

/// Default analyst prompt for a perspective label
pub fn default_system_prompt(label: &str) -> String {
    let viewpoint = match label.to_lowercase().as_str() {
        "conservative" => "a conservative or right-leaning".to_string(),
        "liberal" => "a progressive or liberal".to_string(),
        "socialist" => "a socialist or left-wing".to_string(),
        other => format!("a {}", other),
    };

    format!(
        "You are a {label} political analyst. Your task is to provide factual, informed, \
         and balanced perspectives from {viewpoint} viewpoint.\n\
         - Focus on policies, social issues, and historical context from the {label} perspective.\n\
         - Provide reasoning and evidence for positions, without giving tailored political \
         advice or influencing specific voters.\n\
         - Avoid making recommendations or telling anyone what to think or do.\n\
         - Be clear, structured, and explain the rationale behind your perspective.",
        label = label,
        viewpoint = viewpoint,
    )
}

/// A worker that asks an LLM to answer from one perspective
pub struct PerspectiveWorker {
    perspective: String,
    system_prompt: String,
    llm: Arc<dyn LLMClient>,
}

impl PerspectiveWorker {
    pub fn new(
        perspective: impl Into<String>,
        system_prompt: impl Into<String>,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        Self {
            perspective: perspective.into(),
            system_prompt: system_prompt.into(),
            llm,
        }
    }

    /// Worker using [`default_system_prompt`] for its label
    pub fn with_default_prompt(perspective: impl Into<String>, llm: Arc<dyn LLMClient>) -> Self {
        let perspective = perspective.into();
        let system_prompt = default_system_prompt(&perspective);
        Self::new(perspective, system_prompt, llm)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }
}

#[async_trait]
impl Worker for PerspectiveWorker {
    fn perspective(&self) -> &str {
        &self.perspective
    }

    async fn produce(&self, query: &str) -> Result<WorkerResponse> {
        let content = self
            .llm
            .generate_with_system(&self.system_prompt, query)
            .await
            .map_err(|e| AppError::WorkerInvocationFailed {
                worker: self.perspective.clone(),
                reason: e.to_string(),
            })?;

        Ok(WorkerResponse::new(self.perspective.clone(), content))
    }
}

/// Register a perspective worker sharing `llm` under `key`
pub fn register_perspective(
    registry: &WorkerRegistry,
    key: &str,
    label: &str,
    system_prompt: Option<String>,
    llm: Arc<dyn LLMClient>,
) -> Result<()> {
    let label = label.to_string();
    let system_prompt = system_prompt.unwrap_or_else(|| default_system_prompt(&label));

    registry.register_fn(key, move || {
        Ok(Arc::new(PerspectiveWorker::new(
            label.clone(),
            system_prompt.clone(),
            Arc::clone(&llm),
        )) as Arc<dyn Worker>)
    })
}

/// Register the conservative, liberal and socialist workers
pub fn register_builtin_workers(registry: &WorkerRegistry, llm: Arc<dyn LLMClient>) -> Result<()> {
    for (key, label) in BUILTIN_PERSPECTIVES {
        register_perspective(registry, key, label, None, Arc::clone(&llm))?;
    }
    Ok(())
}
