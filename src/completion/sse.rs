//! Incremental Server-Sent Events line parser.
//!
//! Chat completion streams arrive as `data:` lines terminated by the
//! `[DONE]` sentinel. Byte chunks from the transport do not align with
//! line boundaries, so the parser buffers the trailing partial line
//! between pushes.

/// Sentinel payload marking the end of a completion stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates byte chunks and yields complete `data:` payloads.
#[derive(Debug, Default)]
pub struct SseLineParser {
    buffer: String,
}

impl SseLineParser {
    /// Create an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes; returns the data payloads of every line
    /// completed by this chunk, in arrival order.
    ///
    /// Comment lines, non-`data` fields and blank event separators are
    /// skipped. Invalid UTF-8 bytes are replaced rather than failing the
    /// stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(data) = parse_data_line(line.trim_end_matches(['\r', '\n'])) {
                payloads.push(data.to_string());
            }
        }
        payloads
    }
}

/// Extract the payload of a `data:` line, if that is what this is.
fn parse_data_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
