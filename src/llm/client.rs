//! LLM Client abstractions and provider management
//!
//! Workers and the synthesis stage only see the [`LLMClient`] trait.
//! Concrete providers live behind Cargo features:
//! - **Ollama** (`ollama`, default): local inference
//! - **OpenAI** (`openai`): OpenAI API and compatible endpoints

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, so workers and the mediator can
/// switch providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with conversation history
    ///
    /// The default folds `system` messages into the system prompt and sends
    /// the rest as a `role: content` transcript. Providers with a native chat
    /// API override this.
    async fn generate_with_history(
        &self,
        messages: &[(String, String)], // (role, content) pairs
    ) -> Result<String> {
        let (system, transcript) = flatten_history(messages);
        self.generate_with_system(&system, &transcript).await
    }

    /// Generate a JSON object that is expected to follow `schema`.
    ///
    /// The default implementation asks for plain text and decodes it as JSON
    /// without any repair: fenced or prose-wrapped output is an error.
    /// Providers with a native JSON mode may override this.
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let raw = self.generate_with_system(system, prompt).await?;
        serde_json::from_str(raw.trim())
            .map_err(|e| AppError::LLM(format!("Structured output was not valid JSON: {}", e)))
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Sampling parameters applied to every request a client makes
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: None,
        }
    }
}

/// Provider enum for runtime selection
///
/// | Provider | Feature | Notes |
/// |----------|---------|-------|
/// | Ollama | `ollama` | Default, local |
/// | OpenAI | `openai` | Also works with compatible APIs |
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Ollama local LLM provider
    ///
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    Ollama {
        base_url: String,
        model: String,
        params: ModelParams,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's Cargo feature is disabled or the
    /// client cannot be configured.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            ))),

            #[cfg(not(feature = "openai"))]
            Provider::OpenAI { model, .. } => Err(AppError::LLM(format!(
                "OpenAI provider requested for model '{}' but the `openai` feature is disabled",
                model
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama {
                base_url,
                model,
                params,
            } => Ok(Box::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                params.clone(),
            )?)),

            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { model, .. } => Err(AppError::LLM(format!(
                "Ollama provider requested for model '{}' but the `ollama` feature is disabled",
                model
            ))),
        }
    }

    /// Check if this provider was compiled in
    pub fn is_implemented(&self) -> bool {
        match self {
            Provider::OpenAI { .. } => cfg!(feature = "openai"),
            Provider::Ollama { .. } => cfg!(feature = "ollama"),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    /// Model identifier this provider will request
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Split `(role, content)` pairs into a system prompt and a transcript
fn flatten_history(messages: &[(String, String)]) -> (String, String) {
    let mut system = Vec::new();
    let mut transcript = Vec::new();
    for (role, content) in messages {
        if role.eq_ignore_ascii_case("system") {
            system.push(content.as_str());
        } else {
            transcript.push(format!("{}: {}", role, content));
        }
    }
    (system.join("\n\n"), transcript.join("\n"))
}
