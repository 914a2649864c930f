//! Vector index trait and the passage projection the core works with.
//!
//! The index itself is an external service; the core only issues k-nearest
//! neighbour queries against it and reads one text field from each hit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A retrieved text passage used as grounding context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
}

impl RetrievedPassage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A raw search hit: every stored field plus the similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub fields: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub score: f32,
}

impl SearchHit {
    /// The hit's value for `field`, if it is a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }
}

/// The vector index collaborator.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return up to `k` hits nearest to `vector`, best first, selecting
    /// `field` (implementations may return more fields).
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        field: &str,
    ) -> Result<Vec<SearchHit>, MemoryError>;
}
