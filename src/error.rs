//! Error types for the assistant core.

/// Top-level error type for the conversational assistant.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Invalid or missing configuration (missing inference token is fatal).
    #[error("config error: {0}")]
    Config(String),

    /// Chat completion request error.
    #[error("completion error: {0}")]
    Completion(String),

    /// Streaming response error (mid-stream transport or decode failure).
    #[error("stream error: {0}")]
    Stream(String),

    /// Image generation error.
    #[error("image error: {0}")]
    Image(String),

    /// Vision captioning error.
    #[error("vision error: {0}")]
    Vision(String),

    /// Speech synthesis error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Archive search error. Callers degrade this to a missing result;
    /// it never reaches the user as a visible failure.
    #[error("archive error: {0}")]
    Archive(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
