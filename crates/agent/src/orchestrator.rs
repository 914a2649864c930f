//! Response orchestrator: one grounded reply per user turn.
//!
//! # Flow
//!
//! 1. Retrieve passages for the query (embedding memoized)
//! 2. Return the cached reply for `(query, passages)` if present
//! 3. Gate the query against the passages; out-of-scope queries never reach
//!    the generation backend
//! 4. Assemble: instruction, context (capped at half the prompt budget),
//!    trimmed history window, current turn
//! 5. Generate, with tool descriptors when tools are supplied
//! 6. Gate the first requested tool call on the same passages, then run it
//!    or append a refusal
//! 7. Cache and return the merged reply
//!
//! Rate limiting degrades to a fixed reply. Other backend failures become a
//! reply carrying the error detail. Neither is cached.

use parley_config::AppConfig;
use parley_core::error::Error;
use parley_core::message::Message;
use parley_core::provider::{Provider, ProviderRequest, ProviderResponse};
use parley_core::retrieval::RetrievedPassage;
use parley_core::tool::{ToolCallRequest, ToolRegistry};
use parley_providers::BackoffPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{BoundedCache, CacheStats};
use crate::context::{HistoryTrimmer, TokenAccountant};
use crate::prompt;
use crate::relevance::{LexicalGate, RelevanceGate, tool_topic};
use crate::retrieval::RetrievalGateway;

/// Generation and shaping knobs for a reply.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// Passages requested per query
    pub top_k: usize,
    pub query_threshold: f64,
    pub tool_threshold: f64,
    /// Prompt tokens available (context limit minus response headroom)
    pub prompt_budget: usize,
    /// Most recent history messages considered for the prompt
    pub history_window: usize,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.generation.model.clone(),
            max_output_tokens: config.generation.max_output_tokens,
            temperature: config.generation.temperature,
            top_p: config.generation.top_p,
            presence_penalty: config.generation.presence_penalty,
            frequency_penalty: config.generation.frequency_penalty,
            top_k: config.retrieval.top_k,
            query_threshold: config.relevance.query_threshold,
            tool_threshold: config.relevance.tool_threshold,
            prompt_budget: config.context.prompt_budget(),
            history_window: config.context.history_window,
        }
    }
}

/// Response cache key: the query and the ordered passage texts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResponseKey {
    query: String,
    passages: Vec<String>,
}

impl ResponseKey {
    fn new(query: &str, passages: &[RetrievedPassage]) -> Self {
        Self {
            query: query.to_string(),
            passages: passages.iter().map(|p| p.text.clone()).collect(),
        }
    }
}

/// What happened on a turn; decides cacheability.
#[derive(Debug)]
enum Outcome {
    Answered(String),
    /// Tool failed, reply still useful but not repeatable
    Partial(String),
    OutOfScope,
    Failed(Error),
}

pub struct ResponseOrchestrator {
    provider: Arc<dyn Provider>,
    retrieval: RetrievalGateway,
    gate: Arc<dyn RelevanceGate>,
    accountant: TokenAccountant,
    trimmer: HistoryTrimmer,
    backoff: BackoffPolicy,
    settings: OrchestratorSettings,
    cache: BoundedCache<ResponseKey, String>,
}

impl ResponseOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        retrieval: RetrievalGateway,
        gate: Arc<dyn RelevanceGate>,
        accountant: TokenAccountant,
        trimmer: HistoryTrimmer,
        backoff: BackoffPolicy,
        settings: OrchestratorSettings,
        cache_capacity: usize,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            retrieval,
            gate,
            accountant,
            trimmer,
            backoff,
            settings,
            cache: BoundedCache::new(cache_capacity, cache_ttl),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        retrieval: RetrievalGateway,
        accountant: TokenAccountant,
    ) -> Self {
        let trimmer = HistoryTrimmer::new(accountant.clone(), config.context.min_retained);
        Self::new(
            provider,
            retrieval,
            Arc::new(LexicalGate),
            accountant,
            trimmer,
            BackoffPolicy::from(&config.backoff),
            OrchestratorSettings::from_config(config),
            config.cache.response_capacity,
            config.cache.ttl_secs.map(Duration::from_secs),
        )
    }

    /// Produce the reply to `user_query` given the session's history.
    ///
    /// Never fails: every error class is rendered as reply text.
    pub async fn respond(
        &self,
        user_query: &str,
        history: &[Message],
        tools: Option<&ToolRegistry>,
    ) -> String {
        let passages = match self
            .retrieval
            .retrieve(user_query, self.settings.top_k)
            .await
        {
            Ok(passages) => passages,
            Err(e) => return self.finish(None, Outcome::Failed(e)),
        };

        let key = ResponseKey::new(user_query, &passages);
        if let Some(reply) = self.cache.get(&key) {
            debug!("Response cache hit");
            return reply;
        }

        let outcome = self.generate(user_query, history, tools, &passages).await;
        self.finish(Some(key), outcome)
    }

    async fn generate(
        &self,
        user_query: &str,
        history: &[Message],
        tools: Option<&ToolRegistry>,
        passages: &[RetrievedPassage],
    ) -> Outcome {
        if !passages.is_empty()
            && !self
                .gate
                .is_related(user_query, passages, self.settings.query_threshold)
        {
            return Outcome::OutOfScope;
        }

        let request = self.build_request(user_query, history, passages, tools);
        let response = match self
            .backoff
            .run(|| self.provider.complete(request.clone()))
            .await
        {
            Ok(response) => response,
            Err(e) => return Outcome::Failed(e.into()),
        };

        self.merge_tool_call(response, passages, tools).await
    }

    /// Assemble the prompt and attach sampling knobs and tool descriptors.
    fn build_request(
        &self,
        user_query: &str,
        history: &[Message],
        passages: &[RetrievedPassage],
        tools: Option<&ToolRegistry>,
    ) -> ProviderRequest {
        let messages = self.assemble_prompt(user_query, history, passages);

        let mut request = ProviderRequest::new(self.settings.model.clone(), messages);
        request.temperature = self.settings.temperature;
        request.top_p = Some(self.settings.top_p);
        request.presence_penalty = Some(self.settings.presence_penalty);
        request.frequency_penalty = Some(self.settings.frequency_penalty);
        request.max_tokens = Some(self.settings.max_output_tokens);
        if let Some(registry) = tools {
            request.tools = registry.definitions();
        }
        request
    }

    pub(crate) fn assemble_prompt(
        &self,
        user_query: &str,
        history: &[Message],
        passages: &[RetrievedPassage],
    ) -> Vec<Message> {
        let budget = self.settings.prompt_budget;

        let context = prompt::context_block(passages);
        let context_cap = budget / 2;
        let context = if self.accountant.count_text(&context) > context_cap {
            debug!(cap = context_cap, "Context truncated to half the prompt budget");
            self.accountant.truncate_to_tokens(&context, context_cap).to_string()
        } else {
            context
        };

        let instruction = Message::system(prompt::SYSTEM_INSTRUCTION);
        let context = Message::system(context);
        let turn = Message::user(user_query);

        let fixed = self.accountant.count(&[instruction.clone(), context.clone(), turn.clone()]);
        let history = self.trimmer.trim(
            self.history_window(history),
            budget.saturating_sub(fixed),
        );

        debug!(
            fixed_tokens = fixed,
            history_messages = history.len(),
            history_tokens = self.accountant.count(&history),
            budget,
            "Prompt assembled"
        );

        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(instruction);
        messages.push(context);
        messages.extend(history);
        messages.push(turn);
        messages
    }

    /// The last `history_window` messages. A leading pinned summary outside
    /// the window is kept in front of it.
    fn history_window(&self, history: &[Message]) -> Vec<Message> {
        let window = self.settings.history_window;
        if history.len() <= window {
            return history.to_vec();
        }

        let start = history.len() - window;
        let mut out = Vec::with_capacity(window + 1);
        if let Some(first) = history.first().filter(|m| m.is_system()) {
            out.push(first.clone());
        }
        out.extend_from_slice(&history[start..]);
        out
    }

    /// Honour the first tool call, if any, and merge its output.
    async fn merge_tool_call(
        &self,
        response: ProviderResponse,
        passages: &[RetrievedPassage],
        tools: Option<&ToolRegistry>,
    ) -> Outcome {
        let reply = response.content.trim().to_string();
        let Some(call) = response.tool_calls.first() else {
            return Outcome::Answered(reply);
        };
        if response.tool_calls.len() > 1 {
            debug!(
                ignored = response.tool_calls.len() - 1,
                "Only the first tool call is honoured"
            );
        }

        let topic = tool_topic(call);
        if passages.is_empty()
            || !self
                .gate
                .is_related(&topic, passages, self.settings.tool_threshold)
        {
            warn!(tool = %call.name, "Tool call rejected by relevance gate");
            return Outcome::Answered(join(&reply, &prompt::tool_refusal(&call.name)));
        }

        match self.invoke(call, tools).await {
            Ok(output) => Outcome::Answered(join(&reply, &output)),
            Err(detail) => Outcome::Partial(join(&reply, &prompt::tool_failure(&call.name, &detail))),
        }
    }

    async fn invoke(&self, call: &ToolCallRequest, tools: Option<&ToolRegistry>) -> Result<String, String> {
        let registry = tools.ok_or_else(|| "no tools are available".to_string())?;
        info!(tool = %call.name, "Invoking tool");
        match registry.execute(call).await {
            Ok(result) if result.success => Ok(result.output),
            Ok(result) => Err(result.output),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                Err(e.to_string())
            }
        }
    }

    /// Render the outcome, caching only complete answers.
    fn finish(&self, key: Option<ResponseKey>, outcome: Outcome) -> String {
        match outcome {
            Outcome::Answered(reply) => {
                if let Some(key) = key {
                    self.cache.insert(key, reply.clone());
                }
                reply
            }
            Outcome::Partial(reply) => reply,
            Outcome::OutOfScope => {
                warn!("Query rejected by relevance gate");
                prompt::OUT_OF_SCOPE_REPLY.to_string()
            }
            Outcome::Failed(e) => {
                if e.is_rate_limited() {
                    warn!("Generation rate limited, returning degraded reply");
                } else {
                    warn!(error = %e, "Turn failed");
                }
                prompt::failure_reply(&e)
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn retrieval(&self) -> &RetrievalGateway {
        &self.retrieval
    }
}

fn join(reply: &str, addition: &str) -> String {
    if reply.is_empty() {
        addition.to_string()
    } else {
        format!("{reply}\n\n{addition}")
    }
}
