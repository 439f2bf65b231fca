//! Parley Control - CLI front-end for the Parley response engine
//!
//! Talks to the engine in-process: an interactive chat loop, one-shot
//! questions, and a dump of the effective configuration.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_common::ParleyConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// Version is embedded at build time
const VERSION: &str = env!("PARLEY_VERSION");

#[derive(Parser)]
#[command(name = "parleyctl")]
#[command(about = "Parley - chat replies without a language model", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Configuration file (defaults to $PARLEY_CONFIG, then the user and system paths)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat; /help lists the chat commands
    Chat {
        /// Sender id the conversation is kept under
        #[arg(long, default_value = "local")]
        sender: String,
    },

    /// Answer a single message and exit
    Ask {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true)]
        message: Vec<String>,

        #[arg(long, default_value = "local")]
        sender: String,

        /// Print the reply as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ParleyConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => commands::show_config(&config),
        Commands::Chat { sender } => {
            let resolver = commands::build_resolver(&config)?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(commands::chat(&resolver, &sender))
        }
        Commands::Ask {
            message,
            sender,
            json,
        } => {
            let resolver = commands::build_resolver(&config)?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(commands::ask(&resolver, &message.join(" "), &sender, json))
        }
    }
}
