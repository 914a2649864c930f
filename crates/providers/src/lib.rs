//! Backend implementations for parley.
//!
//! The OpenAI-compatible adapter implements `parley_core::Provider` for both
//! generation and embeddings. The backoff policy wraps any backend call.

pub mod backoff;
pub mod openai_compat;
pub mod tokenizer;

pub use backoff::BackoffPolicy;
pub use openai_compat::OpenAiCompatProvider;
