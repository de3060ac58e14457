use bytes::{Buf, BytesMut};
use serde::Deserialize;

use crate::utils::AnalysisError;

/// One event from the streaming analysis endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Status {
        #[serde(default)]
        message: String,
    },
    /// Model output so far (cumulative)
    Inference {
        #[serde(default)]
        text: String,
    },
    InferenceComplete {
        #[serde(default)]
        message: String,
    },
    FullResponse {
        #[serde(default)]
        response: String,
    },
    Keyword {
        keyword: String,
        index: usize,
    },
    /// Terminal success event; `keywords` is authoritative
    Complete {
        #[serde(default)]
        keywords: Vec<String>,
        #[serde(default)]
        full_response: Option<String>,
    },
    /// Terminal failure event
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl AnalysisEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisEvent::Complete { .. } | AnalysisEvent::Error { .. })
    }
}

/// Decode one SSE data payload
pub fn decode_event(data: &str) -> Result<AnalysisEvent, AnalysisError> {
    serde_json::from_str(data).map_err(|e| AnalysisError::Decode(format!("{}: {}", e, data)))
}

/// Incremental `text/event-stream` framer.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the data payloads of every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            let text = String::from_utf8_lossy(&line).into_owned();
            if let Some(data) = self.handle_line(text.trim_end_matches('\r')) {
                events.push(data);
            }
        }

        events
    }

    /// Flush an event left open when the stream ends
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(data) = self.handle_line(line.trim_end_matches('\r')) {
                return Some(data);
            }
        }
        self.dispatch()
    }

    fn handle_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_lines.push(value.to_string());
        }
        // event/id/retry fields carry nothing this client uses
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}
