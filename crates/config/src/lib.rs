//! Configuration loading, validation, and management for parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup; a validation
//! failure is a configuration error and should stop the process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generation and embedding backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub relevance: RelevanceConfig,

    #[serde(default)]
    pub backoff: BackoffConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("generation", &self.generation)
            .field("summary", &self.summary)
            .field("embedding", &self.embedding)
            .field("context", &self.context)
            .field("retrieval", &self.retrieval)
            .field("relevance", &self.relevance)
            .field("backoff", &self.backoff)
            .field("cache", &self.cache)
            .field("tokenizer", &self.tokenizer)
            .field("session", &self.session)
            .finish()
    }
}

/// Sampling settings for the answer-generating call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,

    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
}

fn default_model() -> String {
    "gpt-4o".into()
}
fn default_max_output_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.2
}
fn default_top_p() -> f32 {
    0.9
}
fn default_presence_penalty() -> f32 {
    0.6
}
fn default_frequency_penalty() -> f32 {
    0.5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            presence_penalty: default_presence_penalty(),
            frequency_penalty: default_frequency_penalty(),
        }
    }
}

/// Settings for the conversation-digest call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Model override; the generation model is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_summary_max_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_summary_temperature")]
    pub temperature: f32,
}

fn default_summary_max_tokens() -> u32 {
    150
}
fn default_summary_temperature() -> f32 {
    0.3
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_output_tokens: default_summary_max_tokens(),
            temperature: default_summary_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
        }
    }
}

/// Context-window budget and history shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum prompt tokens the backend accepts
    #[serde(default = "default_context_max_tokens")]
    pub max_tokens: usize,

    /// Headroom kept free for the response
    #[serde(default = "default_reserved_tokens")]
    pub reserved_tokens: usize,

    /// Summarize once a session holds more than this many messages
    #[serde(default = "default_summarize_after")]
    pub summarize_after: usize,

    /// Messages kept verbatim after summarization
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Most recent history messages placed in the prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Trimming never shrinks a sequence below this length
    #[serde(default = "default_min_retained")]
    pub min_retained: usize,
}

fn default_context_max_tokens() -> usize {
    4000
}
fn default_reserved_tokens() -> usize {
    500
}
fn default_summarize_after() -> usize {
    25
}
fn default_keep_recent() -> usize {
    10
}
fn default_history_window() -> usize {
    10
}
fn default_min_retained() -> usize {
    2
}

impl ContextConfig {
    /// Tokens available to the prompt once response headroom is reserved.
    pub fn prompt_budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserved_tokens)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_context_max_tokens(),
            reserved_tokens: default_reserved_tokens(),
            summarize_after: default_summarize_after(),
            keep_recent: default_keep_recent(),
            history_window: default_history_window(),
            min_retained: default_min_retained(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Index field holding the passage text
    #[serde(default = "default_text_field")]
    pub text_field: String,
}

fn default_top_k() -> usize {
    3
}
fn default_text_field() -> String {
    "content".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            text_field: default_text_field(),
        }
    }
}

/// Thresholds for the lexical relevance gate. Approximate; tune per corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceConfig {
    #[serde(default = "default_threshold")]
    pub query_threshold: f64,

    #[serde(default = "default_threshold")]
    pub tool_threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            query_threshold: default_threshold(),
            tool_threshold: default_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Total attempts per backend call (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_summary_capacity")]
    pub summary_capacity: usize,

    #[serde(default = "default_embedding_capacity")]
    pub embedding_capacity: usize,

    #[serde(default = "default_response_capacity")]
    pub response_capacity: usize,

    /// Entries older than this are treated as absent (no expiry when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

fn default_summary_capacity() -> usize {
    256
}
fn default_embedding_capacity() -> usize {
    1024
}
fn default_response_capacity() -> usize {
    512
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            summary_capacity: default_summary_capacity(),
            embedding_capacity: default_embedding_capacity(),
            response_capacity: default_response_capacity(),
            ttl_secs: None,
        }
    }
}

/// Which tokenizer backs the token accountant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// ~4 bytes per token, no vocabulary file needed
    #[default]
    Heuristic,
    /// A `tokenizer.json` vocabulary (requires the `hf-tokenizer` feature)
    Huggingface,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub kind: TokenizerKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding one JSONL log per session
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
}

fn default_session_dir() -> PathBuf {
    AppConfig::config_dir().join("sessions")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `PARLEY_API_KEY`, then `OPENAI_API_KEY`
    /// - `PARLEY_API_URL`
    /// - `PARLEY_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("PARLEY_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("PARLEY_API_URL") {
            self.api_url = url;
        }

        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            self.generation.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.into()));

        for temperature in [self.generation.temperature, self.summary.temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return invalid("temperature must be between 0.0 and 2.0");
            }
        }

        if self.generation.top_p <= 0.0 || self.generation.top_p > 1.0 {
            return invalid("generation.top_p must be in (0.0, 1.0]");
        }

        for threshold in [self.relevance.query_threshold, self.relevance.tool_threshold] {
            if !(0.0..=1.0).contains(&threshold) {
                return invalid("relevance thresholds must be between 0.0 and 1.0");
            }
        }

        if self.backoff.max_attempts == 0 {
            return invalid("backoff.max_attempts must be at least 1");
        }

        if self.context.reserved_tokens >= self.context.max_tokens {
            return invalid("context.reserved_tokens must be less than context.max_tokens");
        }

        if self.context.keep_recent >= self.context.summarize_after {
            return invalid("context.keep_recent must be less than context.summarize_after");
        }

        if self.context.min_retained == 0 {
            return invalid("context.min_retained must be at least 1");
        }

        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be at least 1");
        }

        if self.cache.summary_capacity == 0
            || self.cache.embedding_capacity == 0
            || self.cache.response_capacity == 0
        {
            return invalid("cache capacities must be at least 1");
        }

        if self.tokenizer.kind == TokenizerKind::Huggingface && self.tokenizer.path.is_none() {
            return invalid("tokenizer.path is required when tokenizer.kind = \"huggingface\"");
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            generation: GenerationConfig::default(),
            summary: SummaryConfig::default(),
            embedding: EmbeddingConfig::default(),
            context: ContextConfig::default(),
            retrieval: RetrievalConfig::default(),
            relevance: RelevanceConfig::default(),
            backoff: BackoffConfig::default(),
            cache: CacheConfig::default(),
            tokenizer: TokenizerConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
