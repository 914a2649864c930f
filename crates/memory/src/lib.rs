//! Session stores and vector index implementations for parley.
//!
//! These are local collaborators: an ephemeral store for tests, a JSON-lines
//! store with one file per session, and a brute-force cosine index loaded
//! from a pre-embedded corpus.

pub mod file_store;
pub mod in_memory;
pub mod vector;

pub use file_store::FileSessionStore;
pub use in_memory::InMemorySessionStore;
pub use vector::{InMemoryVectorIndex, cosine_similarity};
