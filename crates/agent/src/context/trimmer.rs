//! History trimming to a soft token budget.
//!
//! Oldest messages are dropped first. A leading `System` message (the pinned
//! conversation summary) is never dropped. Trimming stops at `min_retained`
//! messages even if the budget is still exceeded; callers must tolerate the
//! overflow.

use parley_core::message::Message;
use tracing::debug;

use super::token::TokenAccountant;

#[derive(Debug, Clone)]
pub struct HistoryTrimmer {
    accountant: TokenAccountant,
    min_retained: usize,
}

impl HistoryTrimmer {
    pub fn new(accountant: TokenAccountant, min_retained: usize) -> Self {
        Self {
            accountant,
            min_retained: min_retained.max(1),
        }
    }

    pub fn min_retained(&self) -> usize {
        self.min_retained
    }

    /// Drop the oldest removable messages until the sequence fits
    /// `max_tokens` or only `min_retained` messages remain.
    pub fn trim(&self, mut messages: Vec<Message>, max_tokens: usize) -> Vec<Message> {
        let mut total = self.accountant.count(&messages);
        let before = messages.len();

        while total > max_tokens && messages.len() > self.min_retained {
            let index = if messages[0].is_system() { 1 } else { 0 };
            let removed = messages.remove(index);
            total -= self.accountant.count_message(&removed);
        }

        if messages.len() < before {
            debug!(
                dropped = before - messages.len(),
                kept = messages.len(),
                tokens = total,
                budget = max_tokens,
                "History trimmed"
            );
        }
        messages
    }
}
