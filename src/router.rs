//! Intent routing for user turns.
//!
//! Classifies each utterance into exactly one handling strategy using a
//! fixed-priority rule table. The router consults nothing but the turn
//! input and static configuration, so identical input always yields the
//! same decision.

use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;

/// The handling strategy chosen for one turn. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Exact greeting token; answered with the fixed greeting rule.
    Greeting,
    /// Image synthesis request.
    ImageGeneration,
    /// Movie-shaped query; resolved via catalog and archive.
    MovieQuery,
    /// Caption an uploaded image.
    VisionAnalysis,
    /// Everything else: ordinary streamed completion.
    GeneralChat,
}

/// Per-turn input available to the router.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    /// The raw user utterance.
    pub utterance: String,
    /// Image uploaded this turn, if any.
    pub image: Option<Vec<u8>>,
    /// Whether the user invoked the explicit analysis action.
    pub analyze_requested: bool,
}

impl TurnInput {
    /// A plain text turn.
    #[must_use]
    pub fn text(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            image: None,
            analyze_requested: false,
        }
    }

    /// An explicit image-analysis turn.
    #[must_use]
    pub fn analyze(image: Vec<u8>) -> Self {
        Self {
            utterance: String::new(),
            image: Some(image),
            analyze_requested: true,
        }
    }
}

/// Ordered keyword rules over the turn input.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    config: RoutingConfig,
}

impl IntentRouter {
    /// Create a router over the given token lists.
    #[must_use]
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    /// Classify one turn. First matching rule wins:
    ///
    /// 1. uploaded image + analysis action → [`RoutingDecision::VisionAnalysis`]
    /// 2. any image trigger phrase → [`RoutingDecision::ImageGeneration`]
    /// 3. any movie keyword → [`RoutingDecision::MovieQuery`]
    /// 4. exact greeting token (after trim) → [`RoutingDecision::Greeting`]
    /// 5. otherwise → [`RoutingDecision::GeneralChat`]
    ///
    /// All comparisons are case-insensitive.
    #[must_use]
    pub fn route(&self, input: &TurnInput) -> RoutingDecision {
        if input.image.is_some() && input.analyze_requested {
            return RoutingDecision::VisionAnalysis;
        }

        let lowered = input.utterance.to_lowercase();

        if self
            .config
            .image_triggers
            .iter()
            .any(|t| lowered.contains(t.as_str()))
        {
            return RoutingDecision::ImageGeneration;
        }

        if self
            .config
            .movie_keywords
            .iter()
            .any(|k| lowered.contains(k.as_str()))
        {
            return RoutingDecision::MovieQuery;
        }

        if self
            .config
            .greetings
            .iter()
            .any(|g| lowered.trim() == g.as_str())
        {
            return RoutingDecision::Greeting;
        }

        RoutingDecision::GeneralChat
    }

    /// Whether the utterance asks for code (grants the larger token budget).
    #[must_use]
    pub fn is_code_request(&self, utterance: &str) -> bool {
        let lowered = utterance.to_lowercase();
        self.config
            .code_keywords
            .iter()
            .any(|k| lowered.contains(k.as_str()))
    }
}
