//! Vector similarity and a brute-force in-memory index.
//!
//! The index is loaded from a JSON-lines corpus of pre-embedded passages,
//! one object per line with an `embedding` array plus arbitrary fields:
//!
//! ```json
//! {"content": "Rust has no garbage collector.", "embedding": [0.1, 0.2], "source": "faq.md"}
//! ```

use async_trait::async_trait;
use parley_core::error::MemoryError;
use parley_core::retrieval::{SearchHit, VectorIndex};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length, empty, or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

struct IndexedDocument {
    fields: serde_json::Map<String, serde_json::Value>,
    embedding: Vec<f32>,
}

/// A vector index held entirely in memory, scanned linearly per query.
pub struct InMemoryVectorIndex {
    documents: RwLock<Vec<IndexedDocument>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Load a JSONL corpus. Lines without a numeric `embedding` array are
    /// skipped with a warning.
    pub async fn load_jsonl(path: &Path) -> Result<Self, MemoryError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to read corpus {}: {e}", path.display()))
        })?;

        let index = Self::new();
        {
            let mut documents = index.documents.write().await;
            for (lineno, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match Self::parse_line(line) {
                    Some(doc) => documents.push(doc),
                    None => warn!(line = lineno + 1, "Skipping malformed corpus record"),
                }
            }
            debug!(path = %path.display(), count = documents.len(), "Vector corpus loaded");
        }
        Ok(index)
    }

    fn parse_line(line: &str) -> Option<IndexedDocument> {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let serde_json::Value::Object(mut fields) = value else {
            return None;
        };
        let embedding = fields
            .remove("embedding")?
            .as_array()?
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()?;
        Some(IndexedDocument { fields, embedding })
    }

    /// Add one document.
    pub async fn add(
        &self,
        fields: serde_json::Map<String, serde_json::Value>,
        embedding: Vec<f32>,
    ) {
        self.documents
            .write()
            .await
            .push(IndexedDocument { fields, embedding });
    }

    /// Convenience for adding a document with a single text field.
    pub async fn add_text(&self, field: &str, text: &str, embedding: Vec<f32>) {
        let mut fields = serde_json::Map::new();
        fields.insert(field.to_string(), serde_json::Value::String(text.to_string()));
        self.add(fields, embedding).await;
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        field: &str,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        let documents = self.documents.read().await;

        let mut scored: Vec<SearchHit> = documents
            .iter()
            .filter(|doc| doc.fields.contains_key(field))
            .map(|doc| SearchHit {
                fields: doc.fields.clone(),
                score: cosine_similarity(&doc.embedding, vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}
