//! TOML-based configuration for Parley
//!
//! Providers, models, timeouts and the perspective roster are declared in a
//! TOML file (`parley.toml`). Models reference providers by name and
//! perspectives reference models by name; [`ParleyConfig::load`] checks
//! every reference before the server starts.

use crate::llm::{ModelParams, Provider};
use crate::orchestration::{DispatchConfig, SynthesisConfig};
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from parley.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    pub mediator: MediatorConfig,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub synthesis: SynthesisSettings,

    /// Perspective workers keyed by worker key
    #[serde(default)]
    pub perspectives: BTreeMap<String, PerspectiveConfig>,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens, provider default when unset
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl ModelConfig {
    pub fn params(&self) -> ModelParams {
        ModelParams {
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
        }
    }
}

// ============= Pipeline Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// Model used for routing and synthesis
    pub model: String,

    /// Let the mediator pick perspectives when a request names none
    #[serde(default = "default_true")]
    pub routing: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    #[serde(default = "default_synthesis_timeout_secs")]
    pub strict_timeout_secs: u64,

    #[serde(default = "default_synthesis_timeout_secs")]
    pub fallback_timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            strict_timeout_secs: default_synthesis_timeout_secs(),
            fallback_timeout_secs: default_synthesis_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// Each synthesis call gets less time than the whole fan-out
fn default_synthesis_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerspectiveConfig {
    /// Label attached to this perspective's responses
    pub label: String,

    /// Reference to a model name defined in [models]
    pub model: String,

    /// Overrides the built-in analyst prompt
    pub system_prompt: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Configuration file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by '{1}' does not exist")]
    MissingModel(String, String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Configuration(e.to_string())
    }
}

const DEFAULT_CONFIG: &str = r#"# Parley configuration

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"

# ============= Providers =============

[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"

# Requires building with `--features openai`
# [providers.openai]
# type = "openai"
# api_key_env = "OPENAI_API_KEY"
# api_base = "https://api.openai.com/v1"

# ============= Models =============

[models.worker]
provider = "ollama-local"
model = "llama3.2"
temperature = 0.7
max_tokens = 200

[models.mediator]
provider = "ollama-local"
model = "llama3.2"
temperature = 0.2

# ============= Pipeline =============

[mediator]
model = "mediator"
routing = true

[dispatch]
timeout_secs = 60

[synthesis]
strict_timeout_secs = 30
fallback_timeout_secs = 30

# ============= Perspectives =============

[perspectives.conservative]
label = "Conservative"
model = "worker"

[perspectives.liberal]
label = "Liberal"
model = "worker"

[perspectives.socialist]
label = "Socialist"
model = "worker"
"#;

impl ParleyConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ParleyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Starter configuration written by `parley init`
    pub fn default_toml() -> &'static str {
        DEFAULT_CONFIG
    }

    /// Validate references, timeouts and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        // Validate model -> provider references
        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        if !self.models.contains_key(&self.mediator.model) {
            return Err(ConfigError::MissingModel(
                self.mediator.model.clone(),
                "mediator".to_string(),
            ));
        }

        for (key, perspective) in &self.perspectives {
            if !self.models.contains_key(&perspective.model) {
                return Err(ConfigError::MissingModel(
                    perspective.model.clone(),
                    format!("perspective {}", key),
                ));
            }
            if perspective.label.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Perspective '{}' has an empty label",
                    key
                )));
            }
        }

        if self.enabled_perspectives().is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one perspective must be enabled".to_string(),
            ));
        }

        if self.dispatch.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dispatch.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.synthesis.strict_timeout_secs == 0 || self.synthesis.fallback_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "synthesis timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Build a [`Provider`] for a named model, resolving API keys from the environment
    pub fn provider_for_model(&self, model_name: &str) -> Result<Provider, ConfigError> {
        let model = self.models.get(model_name).ok_or_else(|| {
            ConfigError::MissingModel(model_name.to_string(), "lookup".to_string())
        })?;
        let provider = self.providers.get(&model.provider).ok_or_else(|| {
            ConfigError::MissingProvider(model.provider.clone(), model_name.to_string())
        })?;

        Ok(match provider {
            ProviderConfig::Ollama { base_url } => Provider::Ollama {
                base_url: base_url.clone(),
                model: model.model.clone(),
                params: model.params(),
            },
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
            } => Provider::OpenAI {
                api_key: std::env::var(api_key_env)
                    .map_err(|_| ConfigError::MissingEnvVar(api_key_env.clone()))?,
                api_base: api_base.clone(),
                model: model.model.clone(),
                params: model.params(),
            },
        })
    }

    /// Enabled perspectives in key order
    pub fn enabled_perspectives(&self) -> Vec<(&str, &PerspectiveConfig)> {
        self.perspectives
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(k, p)| (k.as_str(), p))
            .collect()
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            timeout: Duration::from_secs(self.dispatch.timeout_secs),
        }
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            strict_timeout: Duration::from_secs(self.synthesis.strict_timeout_secs),
            fallback_timeout: Duration::from_secs(self.synthesis.fallback_timeout_secs),
        }
    }

    /// `host:port` the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
