//! Token accounting and history trimming.
//!
//! Every budget decision in the engine goes through [`TokenAccountant`], so
//! swapping the tokenizer changes all limits consistently.

pub mod token;
pub mod trimmer;

pub use token::TokenAccountant;
pub use trimmer::HistoryTrimmer;
