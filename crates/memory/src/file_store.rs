//! File-based session store: one JSON-lines log per session.
//!
//! Each line is a [`SessionRecord`]. Storage location defaults to
//! `~/.parley/sessions/<session_id>.jsonl`. Records are appended, never
//! rewritten; purge deletes the file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::error::MemoryError;
use parley_core::message::{Message, Role, SessionId};
use parley_core::session::{SessionStore, SessionSummary};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// One persisted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A JSONL-backed session store.
pub struct FileSessionStore {
    dir: PathBuf,
    /// Serializes appends and purges so lines never interleave.
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File session store opened");
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a session's log. Ids are restricted to a filename-safe
    /// alphabet so a session can never address a file outside `dir`.
    fn session_path(&self, session: &SessionId) -> Result<PathBuf, MemoryError> {
        let id = session.as_str();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(MemoryError::Storage(format!("Invalid session id: {id:?}")));
        }
        Ok(self.dir.join(format!("{id}.jsonl")))
    }

    fn parse(content: &str) -> Vec<Message> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<SessionRecord>(line) {
                Ok(record) => Some(Message::new(record.role, record.content)),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted session record");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(
        &self,
        session: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), MemoryError> {
        let path = self.session_path(session)?;
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&record).map_err(|e| {
            MemoryError::Storage(format!("Failed to serialize session record: {e}"))
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to create session directory: {e}"))
        })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open session file: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write session file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to flush session file: {e}")))?;

        Ok(())
    }

    async fn read(&self, session: &SessionId) -> Result<Vec<Message>, MemoryError> {
        let path = self.session_path(session)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(MemoryError::QueryFailed(format!(
                "Failed to read session file: {e}"
            ))),
        }
    }

    async fn purge(&self, session: &SessionId) -> Result<(), MemoryError> {
        let path = self.session_path(session)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemoryError::Storage(format!(
                "Failed to delete session file: {e}"
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, MemoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MemoryError::QueryFailed(format!(
                    "Failed to read session directory: {e}"
                )));
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            MemoryError::QueryFailed(format!("Failed to read session directory: {e}"))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(SessionId::from(stem));
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            // Files with ids outside the session alphabet are not ours
            let Ok(messages) = self.read(&id).await else {
                debug!(session = %id, "Skipping unreadable session file");
                continue;
            };
            if !messages.is_empty() {
                summaries.push(SessionSummary::from_messages(id, &messages));
            }
        }
        Ok(summaries)
    }
}
