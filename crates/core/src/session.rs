//! Session store trait: the durable, key-ordered message log.
//!
//! Single writer per session is the store's responsibility; the core never
//! mutates one session concurrently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::message::{Message, Role, SessionId};

/// Chars of the first user message kept in a session title.
pub const TITLE_CHARS: usize = 20;

/// One entry of a session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    /// First user message, cut to [`TITLE_CHARS`] and followed by "...";
    /// "Untitled" when the session has no user message.
    pub title: String,
}

impl SessionSummary {
    pub fn from_messages(id: SessionId, messages: &[Message]) -> Self {
        let title = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| {
                let head: String = m.content.chars().take(TITLE_CHARS).collect();
                format!("{head}...")
            })
            .unwrap_or_else(|| "Untitled".to_string());
        Self { id, title }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// Append one message to the end of the session's log.
    async fn append(
        &self,
        session: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), MemoryError>;

    /// All messages of the session in chronological order (empty if unknown).
    async fn read(&self, session: &SessionId) -> Result<Vec<Message>, MemoryError>;

    /// Delete every message of the session.
    async fn purge(&self, session: &SessionId) -> Result<(), MemoryError>;

    /// Every session holding at least one message, ordered by id.
    async fn list(&self) -> Result<Vec<SessionSummary>, MemoryError>;
}
