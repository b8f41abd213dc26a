//! CLI module for Parley
//!
//! Provides command-line interface parsing for the `parley` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parley - multi-perspective deliberation server
///
/// Fans a question out to concurrent perspective workers and synthesizes
/// their answers into one structured result.
#[derive(Parser, Debug)]
#[command(
    name = "parley",
    version,
    about = "Parley - multi-perspective deliberation server",
    long_about = "Fans a question out to concurrent perspective workers and synthesizes\n\
                  their answers into a neutral summary with the conflicts between them.\n\n\
                  Run without arguments to start the server, or use 'init' to create a config file.",
    after_help = "EXAMPLES:\n    \
                  parley init                                  # Write a starter parley.toml\n    \
                  parley                                       # Start the server\n    \
                  parley ask \"Should rail be public?\"          # One-off deliberation\n    \
                  parley ask \"Taxes?\" -p liberal,socialist     # Pick perspectives explicitly\n    \
                  parley --config my.toml perspectives         # List configured perspectives"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "parley.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the HTTP server
    Serve,

    /// Run a single deliberation and print the result
    Ask {
        /// The question to deliberate on
        query: String,

        /// Comma-separated perspective keys; the mediator chooses when omitted
        #[arg(short, long, value_delimiter = ',')]
        perspectives: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured perspectives
    Perspectives,

    /// Write a starter parley.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing parley.toml
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand to run, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}
