//! Init command implementation
//!
//! Writes a starter `parley.toml` and `.env.example` into a directory.

use super::output::Output;
use crate::utils::toml_config::{ConfigError, ParleyConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file written by `parley init`
pub const CONFIG_FILE_NAME: &str = "parley.toml";

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// parley.toml already exists and `--force` was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Write the starter files, without any terminal output
pub fn scaffold(config: &InitConfig) -> Result<PathBuf, ConfigError> {
    let config_path = config.path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !config.force {
        return Err(ConfigError::AlreadyExists(config_path));
    }

    fs::create_dir_all(&config.path)?;
    fs::write(&config_path, ParleyConfig::default_toml())?;
    write_file(
        &config.path.join(".env.example"),
        generate_env_example(),
        config.force,
    )?;

    Ok(config_path)
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Parley");

    match scaffold(&config) {
        Ok(path) => {
            output.created("config", &path.display().to_string());
            output.created("env", ".env.example");
        }
        Err(ConfigError::AlreadyExists(path)) => {
            output.warning(&format!("{} already exists!", path.display()));
            output.hint("Use --force to overwrite existing files");
            return InitResult::AlreadyExists;
        }
        Err(e) => {
            output.error(&format!("Failed to initialize: {}", e));
            return InitResult::Error(e.to_string());
        }
    }

    output.header("Next Steps");
    output.info("1. Start Ollama and pull the default model:");
    output.command("ollama serve");
    output.command("ollama pull llama3.2");
    output.newline();
    output.info("2. Start the server:");
    output.command("parley serve");
    output.newline();
    output.info("3. Or ask a single question:");
    output.command("parley ask \"Should public transport be free?\"");

    output.hint("Edit parley.toml to add perspectives or switch providers");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn generate_env_example() -> &'static str {
    r#"# Parley environment variables

# Log filter, overrides [server].log_level
# RUST_LOG=parley=debug,tower_http=info

# Only needed when an [providers.*] entry has type = "openai"
# OPENAI_API_KEY=sk-...
"#
}
