//! Conversation summarizer: compresses old turns into one system message.
//!
//! Digests are memoized by the SHA-256 of the exact transcript being
//! summarized. A rate-limited backend yields a fixed placeholder, which is
//! never cached, and compaction then leaves the history unsummarized.

use parley_config::AppConfig;
use parley_core::error::{Error, ProviderError};
use parley_core::message::{Message, transcript};
use parley_core::provider::{Provider, ProviderRequest};
use parley_providers::BackoffPolicy;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{BoundedCache, CacheStats};
use crate::prompt::{DEGRADED_SUMMARY, SUMMARY_INSTRUCTION, SUMMARY_PREFIX};

/// Sampling settings for the digest call.
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl SummarizerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config
                .summary
                .model
                .clone()
                .unwrap_or_else(|| config.generation.model.clone()),
            max_output_tokens: config.summary.max_output_tokens,
            temperature: config.summary.temperature,
        }
    }
}

pub struct ConversationSummarizer {
    provider: Arc<dyn Provider>,
    backoff: BackoffPolicy,
    settings: SummarizerSettings,
    cache: BoundedCache<String, String>,
}

impl ConversationSummarizer {
    pub fn new(
        provider: Arc<dyn Provider>,
        backoff: BackoffPolicy,
        settings: SummarizerSettings,
        capacity: usize,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            backoff,
            settings,
            cache: BoundedCache::new(capacity, ttl),
        }
    }

    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Self {
        Self::new(
            provider,
            BackoffPolicy::from(&config.backoff),
            SummarizerSettings::from_config(config),
            config.cache.summary_capacity,
            config.cache.ttl_secs.map(Duration::from_secs),
        )
    }

    /// Cache key: SHA-256 hex of the transcript.
    pub fn fingerprint(history: &[Message]) -> String {
        hex::encode(Sha256::digest(transcript(history).as_bytes()))
    }

    /// A short digest of `history`. Rate limiting yields [`DEGRADED_SUMMARY`];
    /// any other backend failure is returned as an error.
    pub async fn summarize(&self, history: &[Message]) -> Result<String, Error> {
        Ok(self
            .digest(history)
            .await?
            .unwrap_or_else(|| DEGRADED_SUMMARY.to_string()))
    }

    /// `Ok(None)` when the backend stayed rate limited.
    async fn digest(&self, history: &[Message]) -> Result<Option<String>, ProviderError> {
        let key = Self::fingerprint(history);
        if let Some(summary) = self.cache.get(&key) {
            debug!(messages = history.len(), "Summary cache hit");
            return Ok(Some(summary));
        }

        let mut request = ProviderRequest::new(
            self.settings.model.clone(),
            vec![
                Message::system(SUMMARY_INSTRUCTION),
                Message::user(transcript(history)),
            ],
        );
        request.temperature = self.settings.temperature;
        request.max_tokens = Some(self.settings.max_output_tokens);

        debug!(messages = history.len(), "Summary cache miss, calling backend");
        match self
            .backoff
            .run(|| self.provider.complete(request.clone()))
            .await
        {
            Ok(response) => {
                let summary = response.content.trim().to_string();
                self.cache.insert(key, summary.clone());
                Ok(Some(summary))
            }
            Err(e) if e.is_rate_limited() => {
                warn!("Summarizer rate limited, using placeholder");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Replace all but the last `keep_recent` messages with one system
    /// message carrying their digest. When no digest can be produced the
    /// history is returned unchanged.
    pub async fn compact(&self, history: Vec<Message>, keep_recent: usize) -> Vec<Message> {
        if history.len() <= keep_recent {
            return history;
        }

        let split = history.len() - keep_recent;
        match self.digest(&history[..split]).await {
            Ok(Some(summary)) => {
                info!(
                    summarized = split,
                    kept = keep_recent,
                    "Conversation compacted"
                );
                let mut compacted = Vec::with_capacity(keep_recent + 1);
                compacted.push(Message::system(format!("{SUMMARY_PREFIX}{summary}")));
                compacted.extend_from_slice(&history[split..]);
                compacted
            }
            Ok(None) => history,
            Err(e) => {
                warn!(error = %e, "Summarization failed, continuing with full history");
                history
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
