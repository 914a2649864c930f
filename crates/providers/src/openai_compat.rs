//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, Azure-style proxies, Ollama, vLLM and any endpoint
//! exposing `/chat/completions` and `/embeddings`.
//!
//! Supports:
//! - Chat completions with sampling knobs (temperature, top-p, penalties)
//! - Tool use / function calling
//! - Embeddings

use async_trait::async_trait;
use parley_config::AppConfig;
use parley_core::error::ProviderError;
use parley_core::message::Message;
use parley_core::provider::*;
use parley_core::tool::ToolCallRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible generation and embedding backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Build from application config. A missing API key is a configuration
    /// error and should stop startup.
    pub fn from_config(config: &AppConfig) -> parley_core::Result<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            parley_core::Error::config(
                "no API key configured (set api_key, PARLEY_API_KEY or OPENAI_API_KEY)",
            )
        })?;
        Ok(Self::new("openai", config.api_url.as_str(), api_key))
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: Some(m.content.clone()),
                tool_calls: None,
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Build the JSON body for a chat completion.
    fn completion_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(top_p) = request.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if let Some(presence) = request.presence_penalty {
            body["presence_penalty"] = serde_json::json!(presence);
        }
        if let Some(frequency) = request.frequency_penalty {
            body["frequency_penalty"] = serde_json::json!(frequency);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// Map the HTTP status to the error taxonomy. 429 is the only status that
    /// becomes `RateLimited`.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }

    fn transport_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    /// Turn an API tool call into a request with parsed JSON arguments.
    fn parse_tool_call(tc: ApiToolCall) -> Result<ToolCallRequest, ProviderError> {
        let arguments = if tc.function.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&tc.function.arguments).map_err(|e| {
                ProviderError::InvalidResponse(format!(
                    "tool call '{}' has malformed arguments: {e}",
                    tc.function.name
                ))
            })?
        };

        Ok(ToolCallRequest {
            id: tc.id,
            name: tc.function.name,
            arguments,
        })
    }
}

#[async_trait]
impl parley_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::completion_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let response = Self::check_status(response).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(Self::parse_tool_call)
            .collect::<Result<Vec<_>, _>>()?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage,
            model: api_response.model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let response = Self::check_status(response).await?;

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        let mut data = api_resp.data;
        data.sort_by_key(|d| d.index);
        let embeddings = data.into_iter().map(|d| d.embedding).collect();

        let usage = api_resp.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: 0,
            total_tokens: u.total_tokens,
        });

        Ok(EmbeddingResponse {
            embeddings,
            model: api_resp.model,
            usage,
        })
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    model: String,
    usage: Option<EmbeddingApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Provider;

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert_eq!(provider.name(), "openai");
        assert!(provider.base_url.contains("api.openai.com"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("local", "http://localhost:11434/v1/", "x");
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = AppConfig::default();
        let err = OpenAiCompatProvider::from_config(&config).err().unwrap();
        assert!(matches!(err, parley_core::Error::Config { .. }));

        let config = AppConfig {
            api_key: Some("sk-test".into()),
            api_url: "http://proxy.internal/v1".into(),
            ..AppConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "http://proxy.internal/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "weather".into(),
            description: "Current weather for a city".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools.len(), 1);
        assert_eq!(api_tools[0].function.name, "weather");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn completion_body_forwards_sampling_knobs() {
        let mut request = ProviderRequest::new("gpt-4o", vec![Message::user("hi")]);
        request.max_tokens = Some(500);
        request.top_p = Some(0.9);
        request.presence_penalty = Some(0.6);
        request.frequency_penalty = Some(0.5);

        let body = OpenAiCompatProvider::completion_body(&request);
        assert_eq!(body["max_tokens"], 500);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!((body["presence_penalty"].as_f64().unwrap() - 0.6).abs() < 1e-6);
        assert!((body["frequency_penalty"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn completion_body_omits_unset_knobs() {
        let request = ProviderRequest::new("gpt-4o", vec![]);
        let body = OpenAiCompatProvider::completion_body(&request);
        assert!(body.get("top_p").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parse_response_with_tool_call() {
        let data = r#"{
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "weather", "arguments": "{\"city\":\"Paris\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        let choice = parsed.choices.into_iter().next().unwrap();
        assert!(choice.message.content.is_none());

        let tc = choice.message.tool_calls.unwrap().into_iter().next().unwrap();
        let call = OpenAiCompatProvider::parse_tool_call(tc).unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "weather");
        assert_eq!(call.arguments["city"], "Paris");
    }

    #[test]
    fn malformed_tool_arguments_are_invalid_response() {
        let tc = ApiToolCall {
            id: "call_1".into(),
            r#type: "function".into(),
            function: ApiFunction {
                name: "weather".into(),
                arguments: "{not json".into(),
            },
        };
        let err = OpenAiCompatProvider::parse_tool_call(tc).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn empty_tool_arguments_become_empty_object() {
        let tc = ApiToolCall {
            id: "call_1".into(),
            r#type: "function".into(),
            function: ApiFunction {
                name: "now".into(),
                arguments: String::new(),
            },
        };
        let call = OpenAiCompatProvider::parse_tool_call(tc).unwrap();
        assert!(call.arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn parse_embedding_response() {
        let data = r#"{
            "data": [
                {"embedding": [0.4, 0.5, 0.6], "index": 1},
                {"embedding": [0.1, 0.2, 0.3], "index": 0}
            ],
            "model": "text-embedding-3-large",
            "usage": {"prompt_tokens": 8, "total_tokens": 8}
        }"#;
        let parsed: EmbeddingApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].index, 1);
        assert_eq!(parsed.data[1].embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(parsed.model, "text-embedding-3-large");
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 8);
    }
}
