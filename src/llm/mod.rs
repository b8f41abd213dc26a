//! LLM Provider Clients and Abstractions
//!
//! Every model call in Parley (perspective workers, the router, the synthesis
//! stage) goes through the [`LLMClient`] trait, so providers are swappable and
//! tests can substitute scripted clients.
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API (GPT-4o, GPT-4o-mini, compatible endpoints)
//!
//! # Example
//!
//! ```ignore
//! use parley::llm::{ModelParams, Provider};
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//!     params: ModelParams::default(),
//! };
//! let client = provider.create_client().await?;
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, ModelParams, Provider};
