//! Remote message archive search.
//!
//! Searches a configured archive channel for a term and normalizes the
//! outcome into [`ArchiveSearchResult`]. The transport itself lives behind
//! [`ArchiveConnector`]; this module owns the policy around it: greeting
//! short-circuit, credential gating, one short-lived session per call with
//! teardown on every exit path, and silent degradation of failures to
//! `NotFound`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::ArchiveConfig;
use crate::error::AssistantError;

/// Units for [`convert_size`], base-1024.
const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Captions longer than this are truncated with an ellipsis.
const CAPTION_LIMIT: usize = 200;

/// Extension reported when an attachment has none.
const DEFAULT_FORMAT: &str = "file";

/// An attachment on an archive message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Attachment size in bytes.
    pub size: u64,
    /// File extension without the dot, if known.
    pub extension: Option<String>,
}

/// One message record returned by the archive transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMessage {
    /// Message identifier within the channel.
    pub id: i64,
    /// Upload timestamp.
    pub date: DateTime<Utc>,
    /// Message text / caption.
    pub text: String,
    /// Attached file, if any.
    pub file: Option<ArchiveFile>,
}

/// Normalized outcome of one archive search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSearchResult {
    /// Required connection parameters are absent; no connection attempted.
    ConfigError,
    /// No match (including every failure mode of the transport).
    NotFound,
    /// The first matching message.
    Found {
        /// Deep link to the message.
        link: String,
        /// Human-readable upload date.
        date: String,
        /// Human-readable attachment size.
        size: String,
        /// Attachment extension, or a generic marker.
        format: String,
        /// Message caption, truncated to 200 characters.
        caption: String,
    },
}

/// One authenticated archive session. Short-lived: one search, then close.
#[async_trait]
pub trait ArchiveSession: Send {
    /// Server-side search for `term` in `channel_id`, newest-relevant first,
    /// returning at most `limit` messages (callers pass 1).
    async fn search(
        &mut self,
        channel_id: &str,
        term: &str,
        limit: usize,
    ) -> anyhow::Result<Option<ArchiveMessage>>;

    /// Tear down the session. Called on every exit path of a search.
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Opens authenticated archive sessions from connection parameters.
#[async_trait]
pub trait ArchiveConnector: Send + Sync {
    /// Open a fresh session. No pooling: each search gets its own.
    async fn connect(&self, config: &ArchiveConfig) -> anyhow::Result<Box<dyn ArchiveSession>>;
}

#[async_trait]
impl ArchiveConnector for Box<dyn ArchiveConnector> {
    async fn connect(&self, config: &ArchiveConfig) -> anyhow::Result<Box<dyn ArchiveSession>> {
        (**self).connect(config).await
    }
}

/// Archive search client: policy layer over an [`ArchiveConnector`].
pub struct ArchiveClient<C> {
    config: ArchiveConfig,
    connector: C,
    greetings: Vec<String>,
}

impl<C: ArchiveConnector> ArchiveClient<C> {
    /// Create a client over the given connector.
    ///
    /// `greetings` are tokens that short-circuit to `NotFound` without a
    /// remote call (exact match after trim + lowercase).
    #[must_use]
    pub fn new(config: ArchiveConfig, connector: C, greetings: Vec<String>) -> Self {
        Self {
            config,
            connector,
            greetings,
        }
    }

    /// Search the configured channel for `term`.
    ///
    /// Never returns an error: transport, auth, and unexpected failures are
    /// logged and degrade to [`ArchiveSearchResult::NotFound`].
    pub async fn search(&self, term: &str) -> ArchiveSearchResult {
        let normalized = term.trim().to_lowercase();
        if self.greetings.iter().any(|g| *g == normalized) {
            return ArchiveSearchResult::NotFound;
        }

        if !self.config.is_complete() {
            return ArchiveSearchResult::ConfigError;
        }
        let Some(channel_id) = self.config.channel_id.as_deref() else {
            return ArchiveSearchResult::ConfigError;
        };

        let mut session = match self.connector.connect(&self.config).await {
            Ok(session) => session,
            Err(err) => return degrade("connect", err),
        };

        let outcome = session.search(channel_id, term, 1).await;

        // Teardown runs regardless of the search outcome.
        if let Err(err) = session.close().await {
            warn!("archive session close failed: {err:#}");
        }

        match outcome {
            Ok(Some(message)) => found(channel_id, &message),
            Ok(None) => ArchiveSearchResult::NotFound,
            Err(err) => degrade("search", err),
        }
    }

    /// Blocking adapter for callers that are not themselves asynchronous.
    ///
    /// Runs [`search`](Self::search) to completion on a dedicated
    /// single-thread runtime on its own OS thread, so each call gets an
    /// isolated execution context and the adapter is safe to invoke from
    /// inside or outside another runtime.
    pub fn search_blocking(&self, term: &str) -> ArchiveSearchResult {
        std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let runtime = match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime,
                        Err(err) => {
                            warn!("archive runtime build failed: {err}");
                            return ArchiveSearchResult::NotFound;
                        }
                    };
                    runtime.block_on(self.search(term))
                })
                .join()
                .unwrap_or(ArchiveSearchResult::NotFound)
        })
    }
}

/// Wrap a transport failure as a typed [`AssistantError::Archive`], log it
/// at `warn`, and degrade to [`ArchiveSearchResult::NotFound`].
fn degrade(stage: &str, err: anyhow::Error) -> ArchiveSearchResult {
    let err = AssistantError::Archive(format!("{stage} failed: {err:#}"));
    warn!("{err}");
    ArchiveSearchResult::NotFound
}

/// Map a matched message to [`ArchiveSearchResult::Found`].
fn found(channel_id: &str, message: &ArchiveMessage) -> ArchiveSearchResult {
    let (size, format) = match &message.file {
        Some(file) => (
            convert_size(file.size),
            file.extension
                .clone()
                .unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
        ),
        None => (convert_size(0), DEFAULT_FORMAT.to_string()),
    };

    ArchiveSearchResult::Found {
        link: deep_link(channel_id, message.id),
        date: message.date.format("%d %b %Y").to_string(),
        size,
        format,
        caption: truncate_caption(&message.text),
    }
}

/// Build a deep link to a channel message.
///
/// Numeric channel ids carry a reserved `-100` prefix in the archive's
/// internal form; the public link form strips it.
#[must_use]
pub fn deep_link(channel_id: &str, message_id: i64) -> String {
    let channel = channel_id.strip_prefix("-100").unwrap_or(channel_id);
    format!("https://t.me/c/{channel}/{message_id}")
}

/// Format a byte count into the largest whole base-1024 unit.
///
/// `0` formats as `"0B"`; anything else as `round(size / 1024^i, 2)`
/// followed by the unit, e.g. `convert_size(1024) == "1.0 KB"`.
#[must_use]
pub fn convert_size(size: u64) -> String {
    if size == 0 {
        return "0B".to_string();
    }

    let exponent = (size.ilog2() / 10).min(SIZE_UNITS.len() as u32 - 1);
    let value = size as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;

    // Match round-to-two-decimals display: "1.0 KB", not "1 KB" or "1.00 KB".
    let formatted = if ((rounded * 10.0).round() - rounded * 10.0).abs() < 1e-9 {
        format!("{rounded:.1}")
    } else {
        format!("{rounded:.2}")
    };

    format!("{formatted} {}", SIZE_UNITS[exponent as usize])
}

/// Truncate a caption to 200 characters, appending an ellipsis when cut.
#[must_use]
pub fn truncate_caption(text: &str) -> String {
    if text.chars().count() <= CAPTION_LIMIT {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(CAPTION_LIMIT).collect();
    truncated.push('…');
    truncated
}
