//! Tokenizer trait: pluggable token counting.
//!
//! The tokenizer should match the generation model's vocabulary. The
//! [`HeuristicTokenizer`] is a dependency-free fallback (~4 bytes per token,
//! within ~10% for BPE vocabularies on English text); a vocabulary-exact
//! implementation lives in `parley-providers` behind the `hf-tokenizer`
//! feature.

/// Counts tokens in a piece of text.
pub trait Tokenizer: Send + Sync {
    /// A short name for logs (e.g., "heuristic", "huggingface").
    fn name(&self) -> &str;

    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> usize;
}

/// Character-based estimate: 1 token ≈ 4 bytes, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }
}
