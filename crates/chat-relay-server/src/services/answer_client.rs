use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::session::Turn;

/// Failure classes of one upstream exchange. `Status` and `Transport` map
/// onto distinct user-facing reply strings; everything else (undecodable or
/// malformed bodies) is `Unexpected`. All three roll back the pending turn.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("{0}")]
    Unexpected(String),
}

/// Source of assistant replies, abstracted so the exchange protocol can be
/// exercised against a stub in tests.
#[async_trait::async_trait]
pub trait AnswerProvider: Send + Sync {
    async fn ask(&self, window: &[Turn]) -> Result<String, UpstreamError>;
}

/// HTTP client for the external question-answering API.
///
/// Sends the windowed turn log as a JSON array with basic auth and a long
/// fixed timeout (the upstream batches slow integrations). No retries: a
/// failed exchange surfaces once and the caller rolls back.
pub struct AnswerClient {
    client: Client,
    config: UpstreamConfig,
}

impl AnswerClient {
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout())
                .connect_timeout(config.timeout())
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }
}

#[async_trait::async_trait]
impl AnswerProvider for AnswerClient {
    async fn ask(&self, window: &[Turn]) -> Result<String, UpstreamError> {
        debug!(
            "Relaying {} turn(s) to upstream at {}",
            window.len(),
            self.config.url
        );

        let response = self
            .client
            .post(&self.config.url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(window)
            .send()
            .await
            .map_err(UpstreamError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                UpstreamError::Unexpected(format!("invalid upstream response body: {}", e))
            } else {
                UpstreamError::Transport(e)
            }
        })?;

        parse_reply(&body)
    }
}

/// Interpret a decoded upstream body as the assistant reply.
///
/// A non-empty array yields the first element's `content` field (the element
/// must be an object); a lone object yields its `content` field; a missing
/// field yields the literal `No content`; empty arrays and scalar bodies
/// yield `Empty response`.
pub fn parse_reply(body: &Value) -> Result<String, UpstreamError> {
    match body {
        Value::Array(items) => match items.first() {
            Some(first) if first.is_object() => Ok(content_field(first)),
            Some(first) => Err(UpstreamError::Unexpected(format!(
                "upstream array element is not an object: {}",
                first
            ))),
            None => Ok("Empty response".to_string()),
        },
        Value::Object(_) => Ok(content_field(body)),
        _ => Ok("Empty response".to_string()),
    }
}

fn content_field(object: &Value) -> String {
    match object.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "No content".to_string(),
    }
}
