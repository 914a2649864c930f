//! `parley sessions`, `parley history` and `parley clear`.

use parley_core::message::{Message, SessionId};
use parley_core::session::{SessionStore, SessionSummary};

use super::{CmdResult, load_config, session_store};

pub async fn list() -> CmdResult {
    let config = load_config()?;
    let store = session_store(&config);
    for line in session_lines(&store.list().await?) {
        println!("{line}");
    }
    Ok(())
}

pub async fn history(session: String) -> CmdResult {
    let config = load_config()?;
    let store = session_store(&config);
    let messages = store.read(&SessionId::from(&session)).await?;
    for line in history_lines(&messages) {
        println!("{line}");
    }
    Ok(())
}

pub async fn clear(session: String) -> CmdResult {
    let config = load_config()?;
    let store = session_store(&config);
    store.purge(&SessionId::from(&session)).await?;
    println!("  Session {session} cleared.");
    Ok(())
}

/// One `Role: content` line per message.
pub(crate) fn history_lines(messages: &[Message]) -> Vec<String> {
    if messages.is_empty() {
        return vec!["  No messages found.".to_string()];
    }
    messages
        .iter()
        .map(|m| format!("  {}: {}", m.role.label(), m.content))
        .collect()
}

fn session_lines(sessions: &[SessionSummary]) -> Vec<String> {
    if sessions.is_empty() {
        return vec!["  No sessions found.".to_string()];
    }
    sessions
        .iter()
        .map(|s| format!("  {}  {}", s.id, s.title))
        .collect()
}
