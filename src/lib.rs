//! Sahayak: conversational assistant core.
//!
//! Per user utterance, the engine decides which response strategy to use
//! (greeting, catalog lookup, archive search, generative completion,
//! image/voice synthesis), assembles a per-turn system instruction, and
//! streams the reply into an in-memory multi-modal transcript.
//!
//! # Architecture
//!
//! One turn flows through independent components owned by the engine:
//! - **Intent router**: ordered keyword rules pick the strategy
//! - **Catalog resolver**: exact + fuzzy lookup in a static title table
//! - **Archive client**: best-effort remote search, one session per call
//! - **Prompt assembler**: identity rules + resolution outcome
//! - **Streaming aggregator**: live partial view, ordered accumulation
//! - **Media capabilities**: image/vision/speech side effects
//!
//! The UI layer is an external collaborator: it submits [`TurnInput`]s and
//! renders the transcript and the live [`DisplaySink`] updates.

pub mod aggregate;
pub mod archive;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod error;
pub mod media;
pub mod prompt;
pub mod router;
pub mod session;
pub mod transcript;

pub use aggregate::{CURSOR_MARKER, DisplaySink, NullSink};
pub use archive::{ArchiveConnector, ArchiveSearchResult, ArchiveSession};
pub use catalog::Catalog;
pub use completion::{CompletionClient, HttpCompletionClient};
pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use router::{RoutingDecision, TurnInput};
pub use session::TurnEngine;
pub use transcript::{Message, MessageContent, Role, Transcript};
