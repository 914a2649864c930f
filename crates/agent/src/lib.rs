//! The parley session engine.
//!
//! One conversational turn runs through these stages:
//!
//! 1. **Load** the session's history from the store
//! 2. **Compact** it into a pinned summary once it grows past a threshold
//! 3. **Trim** it to the prompt token budget
//! 4. **Retrieve** reference passages for the query
//! 5. **Gate** the query (and any tool call) on relevance to those passages
//! 6. **Generate** the reply with bounded retries on rate limiting
//! 7. **Append** the exchange back to the store
//!
//! Summaries, query embeddings and replies are memoized in bounded caches.

pub mod cache;
pub mod context;
pub mod orchestrator;
pub mod prompt;
pub mod relevance;
pub mod retrieval;
pub mod session;
pub mod summarizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::{BoundedCache, CacheStats};
pub use context::{HistoryTrimmer, TokenAccountant};
pub use orchestrator::{OrchestratorSettings, ResponseOrchestrator};
pub use relevance::{LexicalGate, RelevanceGate};
pub use retrieval::RetrievalGateway;
pub use session::SessionEngine;
pub use summarizer::{ConversationSummarizer, SummarizerSettings};
