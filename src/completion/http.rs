//! OpenAI-compatible streaming chat completion client.

use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::sse::{DONE_SENTINEL, SseLineParser};
use super::{ChatMessage, CompletionClient, TextFragmentStream};
use crate::config::InferenceConfig;
use crate::error::{AssistantError, Result};

/// Default OpenAI-compatible inference endpoint.
const DEFAULT_BASE_URL: &str = "https://router.huggingface.co";

/// Streaming chat client for OpenAI-compatible `/v1/chat/completions`
/// endpoints, authenticated with a bearer token.
#[derive(Debug)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
    token: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl HttpCompletionClient {
    /// Create a client from the inference configuration.
    ///
    /// Fails with a config error when the token is absent — without it no
    /// turn can proceed.
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AssistantError::Config("inference token is missing".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the base URL (for tests against a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<TextFragmentStream> {
        let request_id = Uuid::new_v4();
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": self.temperature,
            "stream": true,
        });
        debug!(%request_id, model = %self.model, max_tokens, "starting completion stream");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Completion(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Completion(format!(
                "completion request returned {status}: {body_text}"
            )));
        }

        let mut byte_stream = response.bytes_stream();
        let fragments = stream! {
            let mut parser = SseLineParser::new();
            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(AssistantError::Stream(format!(
                            "transport error mid-stream: {err}"
                        )));
                        return;
                    }
                };
                for payload in parser.push(&chunk) {
                    if payload == DONE_SENTINEL {
                        return;
                    }
                    if let Some(text) = extract_delta(&payload) {
                        yield Ok(text);
                    }
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}

/// Pull the text delta out of one streamed chunk, if it carries one.
///
/// Role-only and finish-reason chunks carry no content and are skipped;
/// so are chunks that fail to parse (some providers interleave keepalive
/// payloads).
fn extract_delta(payload: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let content = value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if content.is_empty() {
        return None;
    }
    Some(content.to_string())
}
