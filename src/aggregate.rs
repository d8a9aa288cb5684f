//! Streaming reply aggregation.
//!
//! Consumes a fragment stream in delivery order, keeping a live
//! partial-answer view in the display sink. While the stream runs, the
//! sink shows the accumulated text with a trailing cursor marker; the
//! final update drops the marker. A mid-stream failure keeps whatever was
//! accumulated and reports the error alongside it.

use futures_util::StreamExt;

use crate::completion::TextFragmentStream;
use crate::error::AssistantError;

/// Trailing glyph shown on not-yet-final streamed text.
pub const CURSOR_MARKER: &str = "▌";

/// Live display target for the in-progress reply.
pub trait DisplaySink {
    /// Replace the displayed text.
    fn update(&mut self, text: &str);
}

/// A sink that discards updates, for headless callers.
#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn update(&mut self, _text: &str) {}
}

/// The aggregated reply: full or partial text, plus the error that cut the
/// stream short, if any.
#[derive(Debug)]
pub struct AggregatedReply {
    /// Accumulated text (partial when `error` is set).
    pub text: String,
    /// The failure that ended the stream early.
    pub error: Option<AssistantError>,
}

/// Drain a fragment stream into the sink and return the aggregate.
///
/// Fragments are applied strictly in arrival order; there is no buffering
/// beyond the running string.
pub async fn aggregate(
    mut fragments: TextFragmentStream,
    sink: &mut dyn DisplaySink,
) -> AggregatedReply {
    let mut accumulated = String::new();

    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                accumulated.push_str(&fragment);
                sink.update(&format!("{accumulated}{CURSOR_MARKER}"));
            }
            Err(err) => {
                // Keep the partial text; the caller decides what to do with it.
                sink.update(&accumulated);
                return AggregatedReply {
                    text: accumulated,
                    error: Some(err),
                };
            }
        }
    }

    sink.update(&accumulated);
    AggregatedReply {
        text: accumulated,
        error: None,
    }
}
