//! Translator — turns a natural-language question into candidate SQL
//!
//! Provides a `CompletionBackend` trait with one implementation:
//! - **OpenAI-compatible** — chat completions (OpenRouter by default)
//!
//! The translator is trusted to be helpful, never to be safe: its output is
//! a `CandidateSql` that must pass `guard::validate` before execution.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use crate::config::CompletionConfig;

/// Language tags a model may put after an opening code fence.
const FENCE_TAGS: &[&str] = &["sql", "postgresql", "postgres", "pgsql", "psql"];

/// Sampling temperature for every completion request. Not configurable.
pub const COMPLETION_TEMPERATURE: f32 = 0.0;

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// Abstraction over LLM completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion with a system instruction and a user message,
    /// returning the raw text of the first choice.
    async fn complete(&self, system: &str, user: &str) -> Result<String, TranslationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Empty user text")]
    EmptyInput,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited by completion endpoint: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Completion contained no SQL")]
    EmptyCompletion,
}

impl TranslationError {
    fn is_transient(&self) -> bool {
        matches!(self, TranslationError::Http(_) | TranslationError::RateLimited(_))
    }
}

// ============================================================================
// CandidateSql
// ============================================================================

/// Unverified SQL text produced by the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSql(String);

impl CandidateSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CandidateSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Translate `user_text` into candidate SQL using `schema_description` as the
/// system instruction.
pub async fn translate(
    backend: &dyn CompletionBackend,
    user_text: &str,
    schema_description: &str,
) -> Result<CandidateSql, TranslationError> {
    let user_text = user_text.trim();
    if user_text.is_empty() {
        return Err(TranslationError::EmptyInput);
    }

    let raw = backend.complete(schema_description, user_text).await?;
    let sql = strip_code_fences(&raw);
    if sql.is_empty() {
        return Err(TranslationError::EmptyCompletion);
    }

    Ok(CandidateSql(sql.to_string()))
}

/// Remove a leading ```` ``` ```` / ```` ```sql ```` marker and a trailing
/// ```` ``` ```` marker, trimming whitespace around the result.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();

    if let Some(rest) = s.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| c.is_whitespace())
            .unwrap_or(rest.len());
        let tag = &rest[..tag_len];
        s = if FENCE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            &rest[tag_len..]
        } else {
            rest
        };
    }

    let trimmed = s.trim_end();
    s = trimmed.strip_suffix("```").unwrap_or(trimmed);
    s.trim()
}

// ============================================================================
// Chat completions API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiCompatClient
// ============================================================================

/// Chat-completions client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: Client,
    config: CompletionConfig,
    api_key: String,
}

impl OpenAiCompatClient {
    /// Build a client; `api_key` falls back to `OPENAI_API_KEY`.
    pub fn new(config: CompletionConfig, api_key: Option<String>) -> Result<Self, TranslationError> {
        let api_key = api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        if api_key.trim().is_empty() {
            return Err(TranslationError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn complete_once(&self, system: &str, user: &str) -> Result<String, TranslationError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: COMPLETION_TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(TranslationError::RateLimited(message));
            }
            return Err(TranslationError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(TranslationError::EmptyCompletion)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, TranslationError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        RetryIf::start(
            retry_strategy,
            || self.complete_once(system, user),
            |e: &TranslationError| e.is_transient(),
        )
        .await
    }

    fn name(&self) -> &str {
        "openai-compat"
    }
}

// ============================================================================
// TESTS
// ============================================================================
