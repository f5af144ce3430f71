//! Line-buffered Server-Sent Events parser.
//!
//! Chunks from the byte stream do not line up with event boundaries: one chunk
//! may hold several events, and a payload (or a multi-byte character) may be split
//! across chunks. Bytes are buffered until a full line is available.

use std::mem;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped.
    Data(String),
    /// The `[DONE]` terminator.
    Done,
}

/// Accumulates raw bytes and yields complete `data:` lines.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Append a chunk and return every event completed by it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the byte stream has ended.
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&remaining))
            .into_iter()
            .collect()
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    // `event:`, `id:`, `retry:` and `:` comments carry nothing the caller needs.
    let data = line.trim().strip_prefix("data:")?.trim_start();
    match data.trim_end() {
        "" => None,
        "[DONE]" => Some(SseEvent::Done),
        payload => Some(SseEvent::Data(payload.to_string())),
    }
}
