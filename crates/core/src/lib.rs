//! # parley core
//!
//! Domain types, collaborator traits, and error definitions for the parley
//! conversational session engine. This crate has **no framework
//! dependencies**; it defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (generation and embedding backends, the
//! vector index, the session store, tools, the tokenizer) is a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping backends via configuration
//! - Testing the orchestration layer with scripted mocks
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod session;
pub mod tokenizer;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use retrieval::{RetrievedPassage, SearchHit, VectorIndex};
pub use session::{SessionStore, SessionSummary};
pub use tokenizer::{HeuristicTokenizer, Tokenizer};
pub use tool::{Tool, ToolCallRequest, ToolRegistry, ToolResult};
