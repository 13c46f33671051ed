//! CLI command definitions and dispatch for the `tickertalk` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod ask;
pub mod chat;
pub mod train;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Ask questions about stock prices in plain English.
#[derive(Parser)]
#[command(name = "tickertalk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to ~/.tickertalk/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the WebSocket chat server.
    Serve {
        /// Address to bind (overrides the config file).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file).
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Load training examples into the knowledge store.
    Train {
        /// Training file (YAML or JSON list of records).
        #[arg(long, short, default_value = "training/training.yaml")]
        file: PathBuf,

        /// Also train the DDL of every table in the stock database.
        #[arg(long)]
        schema: bool,

        /// Empty the knowledge store before training.
        #[arg(long)]
        reset: bool,
    },

    /// Ask a single question and print the answer.
    Ask {
        /// The question, in plain English.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Start an interactive chat session.
    Chat,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
