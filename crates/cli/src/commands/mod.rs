//! Subcommand implementations and the shared wiring they use.
//!
//! The binary runs turns without tools. Embedders that want tool calls build
//! a `ToolRegistry` and pass `Some(&registry)` to
//! [`SessionEngine::process_turn`].

pub mod chat;
pub mod config_cmd;
pub mod session;

use parley_agent::SessionEngine;
use parley_config::AppConfig;
use parley_core::retrieval::VectorIndex;
use parley_memory::{FileSessionStore, InMemoryVectorIndex};
use parley_providers::OpenAiCompatProvider;
use std::path::PathBuf;
use std::sync::Arc;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub(crate) fn session_store(config: &AppConfig) -> FileSessionStore {
    FileSessionStore::new(config.session.dir.clone())
}

/// Build the session engine from config. Any configuration problem is
/// returned so the process exits before the first turn.
pub(crate) async fn build_engine(
    config: &AppConfig,
    corpus: Option<PathBuf>,
) -> Result<SessionEngine, Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    PARLEY_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = Arc::new(OpenAiCompatProvider::from_config(config)?);
    let tokenizer = parley_providers::tokenizer::from_config(&config.tokenizer)?;

    let index: Arc<dyn VectorIndex> = match corpus {
        Some(path) => {
            let index = InMemoryVectorIndex::load_jsonl(&path)
                .await
                .map_err(|e| format!("Failed to load corpus {}: {e}", path.display()))?;
            let passages = index.len().await;
            tracing::info!(passages, "Corpus loaded");
            Arc::new(index)
        }
        None => {
            tracing::warn!("No corpus given, answers will have no reference documents");
            Arc::new(InMemoryVectorIndex::new())
        }
    };

    Ok(SessionEngine::from_config(
        config,
        provider,
        index,
        Arc::new(session_store(config)),
        tokenizer,
    ))
}
