//! Side-effect generation capabilities: image synthesis, vision
//! captioning and speech synthesis.
//!
//! Image and vision runs are user-initiated, so their failures surface to
//! the caller. Speech is best-effort enrichment of a stored reply; the
//! engine ignores its error case and keeps the plain text message.

use async_trait::async_trait;
use serde_json::json;

use crate::config::{InferenceConfig, VoiceConfig};
use crate::error::{AssistantError, Result};

/// Default serverless inference endpoint for media models.
const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Produces image bytes from a text prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Render `prompt` into encoded image bytes.
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Produces a short caption from image bytes.
#[async_trait]
pub trait VisionCaptioner: Send + Sync {
    /// Caption the given encoded image.
    async fn caption(&self, image: &[u8]) -> Result<String>;
}

/// Produces audio bytes from text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// HTTP client for hosted media inference models.
pub struct HfMediaClient {
    client: reqwest::Client,
    token: String,
    image_model: String,
    vision_model: String,
    speech_model: String,
    base_url: String,
}

impl HfMediaClient {
    /// Create a media client from the inference and voice configuration.
    pub fn new(inference: &InferenceConfig, voice: &VoiceConfig) -> Result<Self> {
        let token = inference
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AssistantError::Config("inference token is missing".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
            image_model: inference.image_model.clone(),
            vision_model: inference.vision_model.clone(),
            speech_model: format!("facebook/mms-tts-{}", voice.language),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the base URL (for tests against a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{model}", self.base_url)
    }

    async fn post_json_for_bytes(
        &self,
        model: &str,
        inputs: &str,
        wrap: fn(String) -> AssistantError,
    ) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.model_url(model))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&json!({ "inputs": inputs }))
            .send()
            .await
            .map_err(|e| wrap(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(format!("{model} returned {status}: {body}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| wrap(format!("body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for HfMediaClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        self.post_json_for_bytes(&self.image_model, prompt, AssistantError::Image)
            .await
    }
}

#[async_trait]
impl VisionCaptioner for HfMediaClient {
    async fn caption(&self, image: &[u8]) -> Result<String> {
        let response = self
            .client
            .post(self.model_url(&self.vision_model))
            .header("Authorization", format!("Bearer {}", self.token))
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| AssistantError::Vision(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Vision(format!(
                "{} returned {status}: {body}",
                self.vision_model
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Vision(format!("invalid caption response: {e}")))?;
        parse_caption(&value)
            .ok_or_else(|| AssistantError::Vision("caption response had no text".to_string()))
    }
}

#[async_trait]
impl SpeechSynthesizer for HfMediaClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.post_json_for_bytes(&self.speech_model, text, AssistantError::Speech)
            .await
    }
}

/// Captioning models answer `[{"generated_text": "..."}]`.
fn parse_caption(value: &serde_json::Value) -> Option<String> {
    value
        .get(0)?
        .get("generated_text")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}
