//! Retrieval gateway: query embedding (memoized) and k-nearest search.

use parley_config::AppConfig;
use parley_core::error::{Error, ProviderError};
use parley_core::provider::{EmbeddingRequest, Provider};
use parley_core::retrieval::{RetrievedPassage, VectorIndex};
use parley_providers::BackoffPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::{BoundedCache, CacheStats};

pub struct RetrievalGateway {
    embedder: Arc<dyn Provider>,
    index: Arc<dyn VectorIndex>,
    backoff: BackoffPolicy,
    model: String,
    text_field: String,
    cache: BoundedCache<String, Arc<Vec<f32>>>,
}

impl RetrievalGateway {
    pub fn new(
        embedder: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        backoff: BackoffPolicy,
        model: impl Into<String>,
        text_field: impl Into<String>,
        capacity: usize,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            embedder,
            index,
            backoff,
            model: model.into(),
            text_field: text_field.into(),
            cache: BoundedCache::new(capacity, ttl),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        embedder: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self::new(
            embedder,
            index,
            BackoffPolicy::from(&config.backoff),
            config.embedding.model.as_str(),
            config.retrieval.text_field.as_str(),
            config.cache.embedding_capacity,
            config.cache.ttl_secs.map(Duration::from_secs),
        )
    }

    /// The embedding of `query`, from cache or the embedding backend.
    pub async fn embed(&self, query: &str) -> Result<Arc<Vec<f32>>, Error> {
        if let Some(vector) = self.cache.get(&query.to_string()) {
            debug!("Embedding cache hit");
            return Ok(vector);
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            inputs: vec![query.to_string()],
        };
        let response = self
            .backoff
            .run(|| self.embedder.embed(request.clone()))
            .await?;

        let vector = response.embeddings.into_iter().next().ok_or_else(|| {
            ProviderError::InvalidResponse("embedding backend returned no vectors".into())
        })?;
        let vector = Arc::new(vector);

        debug!(dims = vector.len(), "Embedding cache miss, stored");
        self.cache.insert(query.to_string(), Arc::clone(&vector));
        Ok(vector)
    }

    /// Up to `k` passages nearest to `query`, best first. No hits is an
    /// empty result, not an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, Error> {
        let vector = self.embed(query).await?;
        let hits = self.index.search(&vector, k, &self.text_field).await?;

        let passages: Vec<RetrievedPassage> = hits
            .iter()
            .take(k)
            .filter_map(|hit| match hit.text(&self.text_field) {
                Some(text) => Some(RetrievedPassage::new(text)),
                None => {
                    warn!(field = %self.text_field, "Search hit without text field, skipped");
                    None
                }
            })
            .collect();

        debug!(
            index = self.index.name(),
            requested = k,
            returned = passages.len(),
            "Retrieved passages"
        );
        Ok(passages)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
