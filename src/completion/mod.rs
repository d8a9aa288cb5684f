//! Streaming chat completion capability.
//!
//! [`CompletionClient`] is the seam between the turn engine and the
//! generative text backend: an ordered message list plus a token budget in,
//! an ordered stream of text fragments out. [`HttpCompletionClient`] is the
//! production implementation against an OpenAI-compatible endpoint.

mod http;
mod sse;

pub use http::HttpCompletionClient;
pub use sse::SseLineParser;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transcript::Role;

/// One wire-format chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An ordered stream of incremental text fragments.
///
/// A mid-stream failure surfaces as an `Err` item; fragments received
/// before it remain valid.
pub type TextFragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The generative text capability consumed by the turn engine.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Start a streamed completion over the given messages.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<TextFragmentStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("rules")).unwrap_or_default();
        assert_eq!(json["role"], "system");
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap_or_default();
        assert_eq!(json["role"], "user");
        let json = serde_json::to_value(ChatMessage::assistant("hello")).unwrap_or_default();
        assert_eq!(json["role"], "assistant");
    }
}
