//! Parley - multi-perspective deliberation server
//!
//! CLI entry point: serves the HTTP API or runs one-off commands.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use parley::cli::init::{self, InitConfig, InitResult};
use parley::cli::output::Output;
use parley::cli::{Cli, Commands};
use parley::types::{ConversationResponse, PerspectiveInfo};
use parley::{api, AppState, ParleyConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command() {
        Commands::Init { path, force } => {
            init_tracing("info", cli.verbose);
            match init::run(InitConfig { path, force }, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Commands::Serve => {
            let config = load_config(&cli, &output)?;
            init_tracing(&config.server.log_level, cli.verbose);
            serve(config).await
        }
        Commands::Ask {
            query,
            perspectives,
            json,
        } => {
            let config = load_config(&cli, &output)?;
            init_tracing(&config.server.log_level, cli.verbose);
            ask(&config, &query, &perspectives, json, &output).await
        }
        Commands::Perspectives => {
            let config = load_config(&cli, &output)?;
            let perspectives: Vec<PerspectiveInfo> = config
                .enabled_perspectives()
                .into_iter()
                .map(|(key, p)| PerspectiveInfo {
                    key: key.to_string(),
                    label: p.label.clone(),
                })
                .collect();
            output.perspectives(&perspectives);
            output.newline();
            Ok(())
        }
    }
}

/// Logs go to stderr so `ask --json` output stays machine-readable
fn init_tracing(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("parley={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli, output: &Output) -> Result<ParleyConfig> {
    match ParleyConfig::load(&cli.config) {
        Ok(config) => Ok(config),
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Run 'parley init' to create a starter configuration");
            Err(e).with_context(|| format!("loading {}", cli.config.display()))
        }
    }
}

async fn serve(config: ParleyConfig) -> Result<()> {
    let state = AppState::from_config(&config).await?;
    let app = api::build_app(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!("Parley v{} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);
    #[cfg(feature = "swagger-ui")]
    info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn ask(
    config: &ParleyConfig,
    query: &str,
    perspectives: &[String],
    json: bool,
    output: &Output,
) -> Result<()> {
    let state = AppState::from_config(config).await?;
    let orchestrator = state.orchestrator;

    let result = if perspectives.is_empty() {
        orchestrator.route_and_run(query).await
    } else {
        orchestrator.run_detailed(query, perspectives).await
    };

    let deliberation = match result {
        Ok(d) => d,
        Err(e) => {
            output.error(&e.to_string());
            return Err(e.into());
        }
    };

    if json {
        let response = ConversationResponse::from(deliberation);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        output.deliberation(&deliberation);
        output.newline();
    }
    Ok(())
}
