//! Token accounting.
//!
//! Counts are taken with the pluggable [`Tokenizer`], which should match the
//! generation model's vocabulary. Each message's content is tokenized on its
//! own and the counts are summed.

use parley_core::message::Message;
use parley_core::tokenizer::{HeuristicTokenizer, Tokenizer};
use std::sync::Arc;

/// Counts tokens consumed by messages and text.
#[derive(Clone)]
pub struct TokenAccountant {
    tokenizer: Arc<dyn Tokenizer>,
}

impl TokenAccountant {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    /// Name of the underlying tokenizer.
    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    pub fn count_text(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    pub fn count_message(&self, message: &Message) -> usize {
        self.tokenizer.count(&message.content)
    }

    /// Total tokens of a message sequence.
    pub fn count(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.count_message(m)).sum()
    }

    /// Longest prefix of `text` (on a char boundary) that fits `max_tokens`.
    pub fn truncate_to_tokens<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        if self.count_text(text) <= max_tokens {
            return text;
        }

        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());

        // Binary search for the last boundary whose prefix still fits.
        let (mut lo, mut hi) = (0usize, boundaries.len() - 1);
        while lo < hi {
            let mid = (lo + hi).div_ceil(2);
            if self.count_text(&text[..boundaries[mid]]) <= max_tokens {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        &text[..boundaries[lo]]
    }
}

impl Default for TokenAccountant {
    fn default() -> Self {
        Self::new(Arc::new(HeuristicTokenizer))
    }
}

impl std::fmt::Debug for TokenAccountant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAccountant")
            .field("tokenizer", &self.tokenizer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One token per whitespace-separated word.
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn name(&self) -> &str {
            "words"
        }
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn sums_per_message_counts() {
        let accountant = TokenAccountant::default();
        let msgs = vec![
            Message::user("hello"),      // 5 chars → 2 tokens
            Message::assistant("world"), // 5 chars → 2 tokens
        ];
        assert_eq!(accountant.count(&msgs), 4);
    }

    #[test]
    fn empty_sequence_is_zero() {
        assert_eq!(TokenAccountant::default().count(&[]), 0);
    }

    #[test]
    fn uses_the_plugged_tokenizer() {
        let accountant = TokenAccountant::new(Arc::new(WordTokenizer));
        assert_eq!(accountant.tokenizer_name(), "words");
        assert_eq!(
            accountant.count(&[Message::user("one two three"), Message::system("four")]),
            4
        );
    }

    #[test]
    fn truncate_keeps_fitting_text() {
        let accountant = TokenAccountant::default();
        assert_eq!(accountant.truncate_to_tokens("short", 10), "short");
    }

    #[test]
    fn truncate_cuts_to_budget() {
        let accountant = TokenAccountant::default();
        let text = "a".repeat(100);
        let cut = accountant.truncate_to_tokens(&text, 10);
        assert_eq!(cut.len(), 40);
        assert!(accountant.count_text(cut) <= 10);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let accountant = TokenAccountant::default();
        let text = "é".repeat(50); // 2 bytes each
        let cut = accountant.truncate_to_tokens(&text, 5);
        assert!(accountant.count_text(cut) <= 5);
        assert_eq!(cut.len(), 20);
    }

    #[test]
    fn truncate_with_word_tokenizer() {
        let accountant = TokenAccountant::new(Arc::new(WordTokenizer));
        let cut = accountant.truncate_to_tokens("alpha beta gamma delta", 2);
        assert_eq!(cut.split_whitespace().count(), 2);
        assert!(cut.starts_with("alpha beta"));
    }

    #[test]
    fn truncate_to_zero() {
        let accountant = TokenAccountant::default();
        assert_eq!(accountant.truncate_to_tokens("hello", 0), "");
    }
}
