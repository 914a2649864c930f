//! Per-turn session engine.
//!
//! Reads a session's log, compacts and trims it, asks the orchestrator for
//! a reply, and appends the exchange back to the store. Session ids are
//! always explicit.

use parley_config::AppConfig;
use parley_core::error::Error;
use parley_core::message::{Message, Role, SessionId};
use parley_core::provider::Provider;
use parley_core::retrieval::VectorIndex;
use parley_core::session::SessionStore;
use parley_core::tokenizer::Tokenizer;
use parley_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{HistoryTrimmer, TokenAccountant};
use crate::orchestrator::ResponseOrchestrator;
use crate::retrieval::RetrievalGateway;
use crate::summarizer::ConversationSummarizer;

pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    summarizer: ConversationSummarizer,
    trimmer: HistoryTrimmer,
    orchestrator: ResponseOrchestrator,
    summarize_after: usize,
    keep_recent: usize,
    prompt_budget: usize,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        summarizer: ConversationSummarizer,
        trimmer: HistoryTrimmer,
        orchestrator: ResponseOrchestrator,
        summarize_after: usize,
        keep_recent: usize,
        prompt_budget: usize,
    ) -> Self {
        Self {
            store,
            summarizer,
            trimmer,
            orchestrator,
            summarize_after,
            keep_recent,
            prompt_budget,
        }
    }

    /// Wire every component from configuration. One provider serves both
    /// generation and embeddings.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn SessionStore>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Self {
        let accountant = TokenAccountant::new(tokenizer);
        let trimmer = HistoryTrimmer::new(accountant.clone(), config.context.min_retained);
        let retrieval = RetrievalGateway::from_config(config, provider.clone(), index);
        let summarizer = ConversationSummarizer::from_config(config, provider.clone());
        let orchestrator =
            ResponseOrchestrator::from_config(config, provider, retrieval, accountant);

        Self::new(
            store,
            summarizer,
            trimmer,
            orchestrator,
            config.context.summarize_after,
            config.context.keep_recent,
            config.context.prompt_budget(),
        )
    }

    /// Compact long histories into a summary, then trim to the prompt budget.
    pub async fn prepare_history(&self, history: Vec<Message>) -> Vec<Message> {
        self.prepare(history, 0).await
    }

    /// `pending` counts messages of the current turn that are not stored yet;
    /// they count toward the compaction threshold.
    async fn prepare(&self, history: Vec<Message>, pending: usize) -> Vec<Message> {
        let history = if history.len() + pending > self.summarize_after {
            self.summarizer.compact(history, self.keep_recent).await
        } else {
            history
        };
        self.trimmer.trim(history, self.prompt_budget)
    }

    /// Run one conversational turn and persist it.
    ///
    /// Backend failures come back as reply text; only a failure to read the
    /// session log is an error.
    pub async fn process_turn(
        &self,
        session: &SessionId,
        user_input: &str,
        tools: Option<&ToolRegistry>,
    ) -> Result<String, Error> {
        let stored = self.store.read(session).await?;
        let stored_len = stored.len();
        let history = self.prepare(stored, 1).await;
        debug!(
            session = %session,
            stored = stored_len,
            prepared = history.len(),
            "History prepared"
        );

        let reply = self.orchestrator.respond(user_input, &history, tools).await;

        for (role, content) in [(Role::User, user_input), (Role::Assistant, reply.as_str())] {
            if let Err(e) = self.store.append(session, role, content).await {
                warn!(session = %session, error = %e, "Failed to persist message");
            }
        }
        info!(session = %session, "Turn complete");
        Ok(reply)
    }

    /// The session's stored messages in chronological order.
    pub async fn history(&self, session: &SessionId) -> Result<Vec<Message>, Error> {
        Ok(self.store.read(session).await?)
    }

    pub async fn clear(&self, session: &SessionId) -> Result<(), Error> {
        self.store.purge(session).await?;
        info!(session = %session, "Session cleared");
        Ok(())
    }

    pub fn orchestrator(&self) -> &ResponseOrchestrator {
        &self.orchestrator
    }

    pub fn summarizer(&self) -> &ConversationSummarizer {
        &self.summarizer
    }
}
