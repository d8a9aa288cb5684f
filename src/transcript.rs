//! In-memory conversation transcript.
//!
//! Append-only log of multi-modal messages for one session. The transcript
//! is the only shared mutable state in the engine; it is owned by the turn
//! loop and mutated through `append` and `reset` alone. Messages are never
//! edited after they are stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human participant.
    User,
    /// The assistant.
    Assistant,
    /// Instruction-level messages; never shown in the visible transcript.
    System,
}

/// Modality of a message body. Rendering dispatches on this tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain markdown text.
    Text {
        /// The message text.
        text: String,
    },
    /// A generated or uploaded image with its caption.
    Image {
        /// Encoded image bytes.
        bytes: Vec<u8>,
        /// Caption shown under the image.
        caption: String,
    },
    /// Text enriched with a synthesized audio rendition.
    VoicedText {
        /// The message text.
        text: String,
        /// Encoded audio bytes.
        audio: Vec<u8>,
    },
}

impl MessageContent {
    /// The textual body of this message, if it has one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } | Self::VoicedText { text, .. } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// The message body.
    pub content: MessageContent,
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a text message for the given role.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text { text: text.into() },
            timestamp: Utc::now(),
        }
    }

    /// Build an assistant image message.
    #[must_use]
    pub fn image(bytes: Vec<u8>, caption: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Image {
                bytes,
                caption: caption.into(),
            },
            timestamp: Utc::now(),
        }
    }

    /// Build an assistant voiced-text message.
    #[must_use]
    pub fn voiced(text: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::VoicedText {
                text: text.into(),
                audio,
            },
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only conversation log.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the log with an empty sequence.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// All messages in append order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages suitable for display: everything except the system role.
    #[must_use]
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Text-bearing messages in append order, for the completion capability.
    ///
    /// Image messages are skipped; voiced messages contribute their text.
    #[must_use]
    pub fn text_messages(&self) -> Vec<(Role, &str)> {
        self.messages
            .iter()
            .filter_map(|m| m.content.text().map(|t| (m.role, t)))
            .collect()
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn append_and_order() {
        let mut transcript = Transcript::new();
        transcript.append(Message::text(Role::User, "hello"));
        transcript.append(Message::text(Role::Assistant, "hi there"));

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content.text(), Some("hello"));
        assert_eq!(messages[1].content.text(), Some("hi there"));
    }

    #[test]
    fn reset_empties_regardless_of_content() {
        let mut transcript = Transcript::new();
        transcript.append(Message::text(Role::User, "one"));
        transcript.append(Message::image(vec![1, 2, 3], "a picture"));
        transcript.append(Message::voiced("two", vec![4, 5]));

        transcript.reset();
        assert!(transcript.is_empty());
        assert_eq!(transcript.len(), 0);
    }

    #[test]
    fn visible_filters_system_role() {
        let mut transcript = Transcript::new();
        transcript.append(Message::text(Role::System, "rules"));
        transcript.append(Message::text(Role::User, "question"));
        transcript.append(Message::text(Role::Assistant, "answer"));

        let visible: Vec<_> = transcript.visible().collect();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn text_messages_skip_images_keep_voiced() {
        let mut transcript = Transcript::new();
        transcript.append(Message::text(Role::User, "draw a cat"));
        transcript.append(Message::image(vec![0xFF], "a cat"));
        transcript.append(Message::voiced("meow", vec![1]));

        let texts = transcript.text_messages();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], (Role::User, "draw a cat"));
        assert_eq!(texts[1], (Role::Assistant, "meow"));
    }

    #[test]
    fn content_tag_roundtrips_through_serde() {
        let content = MessageContent::Image {
            bytes: vec![9, 8, 7],
            caption: "test".to_string(),
        };
        let json = serde_json::to_string(&content).unwrap();
        assert!(json.contains(r#""kind":"image""#));
        let back: MessageContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }
}
