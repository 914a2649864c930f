//! In-memory session store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use parley_core::error::MemoryError;
use parley_core::message::{Message, Role, SessionId};
use parley_core::session::{SessionStore, SessionSummary};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store that keeps every session's log in a `HashMap`.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions holding at least one message.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(
        &self,
        session: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), MemoryError> {
        self.sessions
            .write()
            .await
            .entry(session.as_str().to_string())
            .or_default()
            .push(Message::new(role, content));
        Ok(())
    }

    async fn read(&self, session: &SessionId) -> Result<Vec<Message>, MemoryError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn purge(&self, session: &SessionId) -> Result<(), MemoryError> {
        self.sessions.write().await.remove(session.as_str());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, MemoryError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(id, messages)| SessionSummary::from_messages(SessionId::from(id), messages))
            .collect();
        summaries.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_read_in_order() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s1");
        store.append(&id, Role::User, "hello").await.unwrap();
        store.append(&id, Role::Assistant, "hi there").await.unwrap();

        let messages = store.read(&id).await.unwrap();
        assert_eq!(
            messages,
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[tokio::test]
    async fn unknown_session_reads_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.read(&SessionId::from("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");
        store.append(&a, Role::User, "for a").await.unwrap();
        store.append(&b, Role::User, "for b").await.unwrap();

        assert_eq!(store.read(&a).await.unwrap(), vec![Message::user("for a")]);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn purge_removes_session() {
        let store = InMemorySessionStore::new();
        let id = SessionId::from("s1");
        store.append(&id, Role::User, "hello").await.unwrap();
        store.purge(&id).await.unwrap();
        assert!(store.read(&id).await.unwrap().is_empty());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn list_titles_sessions_by_first_user_message() {
        let store = InMemorySessionStore::new();
        let b = SessionId::from("b");
        let a = SessionId::from("a");
        store.append(&b, Role::User, "Explain the borrow checker please").await.unwrap();
        store.append(&a, Role::Assistant, "greeting first").await.unwrap();
        store.append(&a, Role::User, "hello").await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(
            listed,
            vec![
                SessionSummary {
                    id: a,
                    title: "hello...".into()
                },
                SessionSummary {
                    id: b,
                    title: "Explain the borrow c...".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn list_is_empty_for_new_store() {
        assert!(InMemorySessionStore::new().list().await.unwrap().is_empty());
    }
}
