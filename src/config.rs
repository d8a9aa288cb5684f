//! Configuration types for the assistant core.
//!
//! All sections deserialize with defaults so a partial TOML file (or none at
//! all) yields a working configuration; only the inference token has no
//! default and is validated as fatal. Credentials are read from the
//! environment, never embedded in config files.

use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Inference provider settings (token + model identifiers).
    pub inference: InferenceConfig,
    /// Remote message archive connection settings.
    pub archive: ArchiveConfig,
    /// Assistant identity facts baked into every system instruction.
    pub persona: PersonaConfig,
    /// Intent routing token lists.
    pub routing: RoutingConfig,
    /// Catalog resolution settings.
    pub catalog: CatalogConfig,
    /// Speech synthesis settings.
    pub voice: VoiceConfig,
}

/// Inference provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// API token for the inference provider. Required; a missing token is
    /// a fatal configuration error (no turn can proceed without it).
    pub token: Option<String>,
    /// Chat completion model identifier.
    pub chat_model: String,
    /// Text-to-image model identifier.
    pub image_model: String,
    /// Image captioning model identifier.
    pub vision_model: String,
    /// Sampling temperature for chat completions.
    pub temperature: f32,
    /// Token budget for ordinary turns.
    pub max_tokens: u32,
    /// Token budget for code-request turns.
    pub max_tokens_code: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            token: None,
            chat_model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            image_model: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            vision_model: "Salesforce/blip-image-captioning-large".to_string(),
            temperature: 0.7,
            max_tokens: 512,
            max_tokens_code: 1024,
        }
    }
}

/// Remote archive connection parameters.
///
/// All four fields must be present for a search to be attempted; otherwise
/// the archive client reports a configuration sentinel and the turn
/// proceeds without search results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Numeric account identifier.
    pub api_id: Option<i64>,
    /// Account secret.
    pub api_hash: Option<String>,
    /// Target channel identifier (may carry the reserved `-100` prefix).
    pub channel_id: Option<String>,
    /// Bot credential used to authenticate the search session.
    pub bot_token: Option<String>,
}

impl ArchiveConfig {
    /// Whether every connection parameter is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.api_id.is_some()
            && self.api_hash.as_deref().is_some_and(|s| !s.is_empty())
            && self.channel_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.bot_token.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Identity facts for the system instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Display name of the assistant.
    pub assistant_name: String,
    /// Name of the owner/creator.
    pub owner_name: String,
    /// Owner's location, used for identity answers.
    pub owner_location: String,
    /// Public channel link offered when a movie is not resolvable.
    pub channel_link: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Rajdev AI".to_string(),
            owner_name: "Rajdev".to_string(),
            owner_location: "India".to_string(),
            channel_link: "https://t.me/+u4cmm3JmIrFlNzZl".to_string(),
        }
    }
}

/// Token lists consumed by the intent router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Phrases that trigger image generation (substring, case-insensitive).
    pub image_triggers: Vec<String>,
    /// Keywords that mark a movie-shaped query.
    pub movie_keywords: Vec<String>,
    /// Greeting tokens (exact match after trim + lowercase).
    pub greetings: Vec<String>,
    /// Keywords that mark a code-request turn (larger token budget).
    pub code_keywords: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            image_triggers: vec![
                "generate image".to_string(),
                "create image".to_string(),
                "photo banao".to_string(),
                "tasveer banao".to_string(),
                "draw".to_string(),
            ],
            movie_keywords: vec!["movie".to_string(), "film".to_string()],
            greetings: vec![
                "hi".to_string(),
                "hello".to_string(),
                "namaste".to_string(),
            ],
            code_keywords: vec![
                "code".to_string(),
                "program".to_string(),
                "script".to_string(),
            ],
        }
    }
}

/// Catalog resolution tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Minimum similarity ratio for a fuzzy catalog match.
    pub fuzzy_threshold: f32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.6,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Language code passed to the speech capability.
    pub language: String,
    /// Replies at or above this many characters skip voice enrichment.
    pub max_chars: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "hi".to_string(),
            max_chars: 400,
        }
    }
}

impl AssistantConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AssistantError::Config(format!("invalid config: {e}")))
    }

    /// Load configuration overrides from the process environment.
    ///
    /// Reads `HF_TOKEN` for the inference token and `ARCHIVE_API_ID`,
    /// `ARCHIVE_API_HASH`, `ARCHIVE_CHANNEL_ID`, `ARCHIVE_BOT_TOKEN` for the
    /// archive credentials. Unset variables leave the existing values alone.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("HF_TOKEN")
            && !token.is_empty()
        {
            self.inference.token = Some(token);
        }
        if let Ok(id) = std::env::var("ARCHIVE_API_ID")
            && let Ok(id) = id.parse::<i64>()
        {
            self.archive.api_id = Some(id);
        }
        if let Ok(hash) = std::env::var("ARCHIVE_API_HASH")
            && !hash.is_empty()
        {
            self.archive.api_hash = Some(hash);
        }
        if let Ok(chan) = std::env::var("ARCHIVE_CHANNEL_ID")
            && !chan.is_empty()
        {
            self.archive.channel_id = Some(chan);
        }
        if let Ok(token) = std::env::var("ARCHIVE_BOT_TOKEN")
            && !token.is_empty()
        {
            self.archive.bot_token = Some(token);
        }
        self
    }

    /// Validate the fatal boundary: the inference token must be present.
    ///
    /// Missing archive credentials are deliberately not checked here; they
    /// degrade per-query instead of blocking startup.
    pub fn validate(&self) -> Result<()> {
        match self.inference.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(()),
            _ => Err(AssistantError::Config(
                "inference token is missing; set HF_TOKEN or inference.token".to_string(),
            )),
        }
    }
}
