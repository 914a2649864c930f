//! parley CLI: the main entry point.
//!
//! Commands:
//! - `chat`     interactive conversation over a persistent session
//! - `ask`      single question, single answer
//! - `sessions` list stored sessions with their titles
//! - `history`  print a session's stored messages
//! - `clear`    delete a session's messages
//! - `config`   show, validate or initialize configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "parley: retrieval-grounded conversational sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively
    Chat {
        /// Resume this session instead of starting a new one
        #[arg(short, long)]
        session: Option<String>,

        /// JSONL corpus of pre-embedded passages
        #[arg(short, long, env = "PARLEY_CORPUS")]
        corpus: Option<PathBuf>,
    },

    /// Ask a single question
    Ask {
        /// The question
        message: String,

        /// Record the exchange in this session
        #[arg(short, long)]
        session: Option<String>,

        /// JSONL corpus of pre-embedded passages
        #[arg(short, long, env = "PARLEY_CORPUS")]
        corpus: Option<PathBuf>,
    },

    /// List stored sessions
    Sessions,

    /// Print a session's history
    History {
        /// Session id
        session: String,
    },

    /// Delete a session's history
    Clear {
        /// Session id
        session: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Check the configuration file
    Validate,
    /// Write a starter config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the conversation
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { session, corpus } => commands::chat::run(session, corpus).await?,
        Commands::Ask {
            message,
            session,
            corpus,
        } => commands::chat::ask(message, session, corpus).await?,
        Commands::Sessions => commands::session::list().await?,
        Commands::History { session } => commands::session::history(session).await?,
        Commands::Clear { session } => commands::session::clear(session).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Validate => commands::config_cmd::validate()?,
            ConfigAction::Init => commands::config_cmd::init()?,
        },
    }

    Ok(())
}
