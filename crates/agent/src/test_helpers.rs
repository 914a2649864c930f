//! Scripted collaborators shared by the unit tests.

use async_trait::async_trait;
use parley_core::error::{MemoryError, ProviderError, ToolError};
use parley_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use parley_core::retrieval::{SearchHit, VectorIndex};
use parley_core::tool::{Tool, ToolCallRequest, ToolResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        retry_after_secs: 1,
    }
}

/// A provider that replays scripted results.
///
/// `complete` pops the next scripted result; once the script is exhausted it
/// keeps returning the fallback. `embed` pops from its own script and
/// otherwise returns a fixed unit vector.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    fallback: Result<ProviderResponse, ProviderError>,
    embed_script: Mutex<VecDeque<Result<Vec<f32>, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    complete_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(ProviderError::InvalidResponse("script exhausted".into())),
            embed_script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            complete_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }

    /// Plain text replies, one per call.
    pub fn texts(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| Ok(Self::text_response(r)))
                .collect(),
        )
    }

    /// Every completion fails with the same error.
    pub fn always(error: ProviderError) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Err(error);
        provider
    }

    pub fn with_embed_script(self, script: Vec<Result<Vec<f32>, ProviderError>>) -> Self {
        *self.embed_script.lock().unwrap() = script.into();
        self
    }

    pub fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: text.to_string(),
            tool_calls: Vec::new(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        }
    }

    pub fn tool_call_response(
        text: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> ProviderResponse {
        let mut response = Self::text_response(text);
        response.tool_calls.push(ToolCallRequest {
            id: format!("call_{tool}"),
            name: tool.to_string(),
            arguments,
        });
        response
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        let vector = self
            .embed_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![1.0, 0.0]))?;
        Ok(EmbeddingResponse {
            embeddings: vec![vector],
            model: request.model,
            usage: None,
        })
    }
}

/// A vector index that returns the same ranked passages for every query.
pub struct StaticIndex {
    texts: Vec<String>,
    searches: AtomicUsize,
}

impl StaticIndex {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(
        &self,
        _vector: &[f32],
        k: usize,
        field: &str,
    ) -> Result<Vec<SearchHit>, MemoryError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .texts
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, text)| {
                let mut fields = serde_json::Map::new();
                fields.insert(field.to_string(), serde_json::json!(text));
                SearchHit {
                    fields,
                    score: 1.0 - i as f32 * 0.1,
                }
            })
            .collect())
    }
}

/// A tool that records how often it ran. Grab [`CountingTool::counter`]
/// before boxing it into a registry.
pub struct CountingTool {
    name: String,
    output: String,
    calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            output: output.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Counts its invocations"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "topic": { "type": "string" } }
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::ok(self.output.clone()))
    }
}
