//! Backend adapter module
//!
//! Defines the adapter contract every wire family implements: encode a
//! canonical request into the backend's wire format, and normalize the
//! backend's reply chunks back into canonical events.

pub mod chat_completions;
pub mod local_ndjson;
pub mod responses;

use crate::models::canonical::{BackendKind, CanonicalChatRequest, CanonicalEvent};
use crate::models::wire::WireUsage;
use crate::utils::error::GatewayResult;

pub use chat_completions::ChatCompletionsAdapter;
pub use local_ndjson::LocalNdjsonAdapter;
pub use responses::ResponsesAdapter;

/// An encoded upstream request, ready to send
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: String,
    pub body: serde_json::Value,
    /// Bearer credential, when the binding has one
    pub bearer: Option<String>,
    /// Whether to ask the backend for an SSE reply
    pub accept_sse: bool,
}

/// Translates between the canonical contract and one backend wire family.
///
/// Adapters are pure: the HTTP transport lives in the upstream client, and
/// per-stream parsing state lives in the `ChunkNormalizer` each adapter
/// hands out per request.
pub trait BackendAdapter: Send + Sync {
    /// Wire family this adapter speaks
    fn kind(&self) -> BackendKind;

    /// Encode a canonical request into the backend's wire format
    fn encode(&self, request: &CanonicalChatRequest) -> GatewayResult<WireRequest>;

    /// Fresh normalizer for one streaming session
    fn normalizer(&self) -> Box<dyn ChunkNormalizer>;

    /// Extract the completion text from a non-streaming reply body
    fn extract_completion(&self, body: &serde_json::Value) -> GatewayResult<String>;

    /// Backend-reported usage from a non-streaming reply body, if present
    fn authoritative_usage(&self, body: &serde_json::Value) -> Option<WireUsage>;
}

/// Per-session stream normalizer.
///
/// Fed raw wire chunks in arrival order; produces canonical events in the
/// same relative order. After a terminal event (Done or Error) a normalizer
/// emits nothing further. Malformed frames are skipped and logged, never
/// fatal.
pub trait ChunkNormalizer: Send {
    /// Feed one wire chunk; returns zero or more canonical events
    fn feed(&mut self, chunk: &[u8]) -> Vec<CanonicalEvent>;

    /// The transport ended; emits the implicit Done if no explicit terminal
    /// event was seen
    fn finish(&mut self) -> Vec<CanonicalEvent>;
}

/// Select the adapter for a backend kind
pub fn adapter_for(kind: BackendKind) -> &'static dyn BackendAdapter {
    match kind {
        BackendKind::ChatCompletions => &ChatCompletionsAdapter,
        BackendKind::Responses => &ResponsesAdapter,
        BackendKind::LocalNdjson => &LocalNdjsonAdapter,
    }
}

/// Reassembles newline-delimited frames that may be split across wire
/// chunks. Buffers bytes, not strings, so multi-byte characters split at a
/// chunk boundary survive intact.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return the complete lines it closed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Take the trailing unterminated line, if any
    pub fn drain(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!line.is_empty()).then_some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_complete_lines() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"one\ntwo\n");
        assert_eq!(lines, vec!["one", "two"]);
        assert!(buffer.drain().is_none());
    }

    #[test]
    fn test_line_buffer_split_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"par").is_empty());
        let lines = buffer.push(b"tial\nnext");
        assert_eq!(lines, vec!["partial"]);
        assert_eq!(buffer.drain(), Some("next".to_string()));
    }

    #[test]
    fn test_line_buffer_crlf() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"data: x\r\n\r\n");
        assert_eq!(lines, vec!["data: x", ""]);
    }

    #[test]
    fn test_line_buffer_utf8_split() {
        let mut buffer = LineBuffer::default();
        let text = "héllo\n".as_bytes();
        // Split in the middle of the two-byte 'é'
        assert!(buffer.push(&text[..2]).is_empty());
        let lines = buffer.push(&text[2..]);
        assert_eq!(lines, vec!["héllo"]);
    }

    #[test]
    fn test_adapter_selection() {
        assert_eq!(
            adapter_for(BackendKind::ChatCompletions).kind(),
            BackendKind::ChatCompletions
        );
        assert_eq!(
            adapter_for(BackendKind::Responses).kind(),
            BackendKind::Responses
        );
        assert_eq!(
            adapter_for(BackendKind::LocalNdjson).kind(),
            BackendKind::LocalNdjson
        );
    }
}
