//! SQL generation through a chat-completion endpoint.

use async_trait::async_trait;
use mira_core::{DbType, GeneratedQuery};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};

pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.x.ai/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "grok-2-1212";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Errors raised while generating SQL. Each one is terminal for the request.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request never produced a response.
    #[error("Failed to generate SQL query: {0}")]
    Transport(#[source] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("Failed to generate SQL query: upstream returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not have the expected shape.
    #[error("Failed to generate SQL query: malformed completion response: {0}")]
    MalformedResponse(String),

    /// The model answered with nothing usable.
    #[error("Failed to generate SQL query: completion contained no SQL")]
    EmptyCompletion,
}

/// Produces one sanitized statement from a prompt.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        db_type: DbType,
        api_key: &str,
    ) -> Result<GeneratedQuery, GenerationError>;
}

/// Settings for [`ChatCompletionGenerator`].
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// `None` leaves the HTTP client's default in place, which is no timeout.
    pub request_timeout: Option<Duration>,
}

impl Default for ChatCompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`SqlGenerator`] backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct ChatCompletionGenerator {
    config: ChatCompletionConfig,
    http_client: reqwest::Client,
}

impl ChatCompletionGenerator {
    pub fn new(config: ChatCompletionConfig) -> Result<Self, GenerationError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(GenerationError::Transport)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn messages(prompt: &str, db_type: DbType) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: format!(
                    "You are a SQL expert. Generate only valid {} queries.",
                    db_type.dialect()
                ),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ]
    }
}

#[async_trait]
impl SqlGenerator for ChatCompletionGenerator {
    async fn generate(
        &self,
        prompt: &str,
        db_type: DbType,
        api_key: &str,
    ) -> Result<GeneratedQuery, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: Self::messages(prompt, db_type),
            temperature: self.config.temperature,
        };

        debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            api_key_set = !api_key.is_empty(),
            "calling completion endpoint"
        );
        let started = Instant::now();

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "completion request failed");
                GenerationError::Transport(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(GenerationError::Transport)?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            let detail = upstream_error_detail(&body);
            error!(
                status = status.as_u16(),
                detail = %detail,
                duration_ms,
                "completion endpoint returned an error"
            );
            return Err(GenerationError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedResponse("no choices".to_string()))?
            .message
            .content
            .ok_or_else(|| GenerationError::MalformedResponse("choice has no content".to_string()))?;

        let query = GeneratedQuery::from_model_output(&content);
        if query.is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        info!(duration_ms, sql = %query, "SQL generated");
        Ok(query)
    }
}

/// Best description of an upstream error body: its `error` field when the
/// body is JSON (string or `{message}` object), else the raw text.
fn upstream_error_detail(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(v) => match v.get("error") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(err) => err
                .get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| err.to_string()),
            None => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    }
}
