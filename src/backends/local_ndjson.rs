//! Local NDJSON adapter
//!
//! Local model servers reply with one JSON object per line and no SSE
//! framing: `message.content` carries the delta, `done: true` ends the
//! stream. Partial corruption of one line must not terminate an otherwise
//! healthy stream.

use super::{BackendAdapter, ChunkNormalizer, LineBuffer, WireRequest};
use crate::models::canonical::{BackendKind, CanonicalChatRequest, CanonicalEvent};
use crate::models::wire::{NdjsonLine, NdjsonOptions, NdjsonRequest, WireChatMessage, WireUsage};
use crate::utils::error::{GatewayError, GatewayResult};
use tracing::warn;

/// Local NDJSON backend adapter
pub struct LocalNdjsonAdapter;

impl LocalNdjsonAdapter {
    fn build_url(base_url: &str) -> String {
        format!("{}/api/chat", base_url.trim_end_matches('/'))
    }
}

impl BackendAdapter for LocalNdjsonAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalNdjson
    }

    fn encode(&self, request: &CanonicalChatRequest) -> GatewayResult<WireRequest> {
        let messages: Vec<WireChatMessage> = request
            .messages
            .iter()
            .map(|message| WireChatMessage {
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
            })
            .collect();

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(NdjsonOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        let wire = NdjsonRequest {
            model: request.binding.model.clone(),
            messages,
            stream: request.stream,
            options,
        };

        Ok(WireRequest {
            url: Self::build_url(&request.binding.base_url),
            body: serde_json::to_value(&wire)
                .map_err(|e| GatewayError::Encode(e.to_string()))?,
            bearer: request.binding.credential.clone(),
            accept_sse: false,
        })
    }

    fn normalizer(&self) -> Box<dyn ChunkNormalizer> {
        Box::new(NdjsonNormalizer::default())
    }

    fn extract_completion(&self, body: &serde_json::Value) -> GatewayResult<String> {
        let line: NdjsonLine = serde_json::from_value(body.clone())
            .map_err(|e| GatewayError::UpstreamProtocol(format!("unexpected reply shape: {}", e)))?;

        if let Some(error) = line.error {
            return Err(GatewayError::UpstreamProtocol(error));
        }

        line.message
            .map(|message| message.content)
            .ok_or_else(|| GatewayError::UpstreamProtocol("reply carried no message".to_string()))
    }

    fn authoritative_usage(&self, body: &serde_json::Value) -> Option<WireUsage> {
        let line: NdjsonLine = serde_json::from_value(body.clone()).ok()?;
        match (line.prompt_eval_count, line.eval_count) {
            (Some(input), Some(output)) => Some(WireUsage {
                input_tokens: input,
                output_tokens: output,
            }),
            _ => None,
        }
    }
}

/// Normalizer for newline-delimited JSON lines
#[derive(Default)]
struct NdjsonNormalizer {
    lines: LineBuffer,
    terminal: bool,
}

impl NdjsonNormalizer {
    fn normalize_line(&mut self, line: &str) -> Option<CanonicalEvent> {
        if line.is_empty() {
            return None;
        }

        let parsed: NdjsonLine = match serde_json::from_str(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Skip the corrupt line, keep the stream alive
                warn!("skipping malformed ndjson line: {} - data: {}", e, line);
                return None;
            }
        };

        if let Some(error) = parsed.error {
            return Some(CanonicalEvent::Error { message: error });
        }
        if parsed.done {
            return Some(CanonicalEvent::Done);
        }
        parsed
            .message
            .map(|message| message.content)
            .filter(|text| !text.is_empty())
            .map(|text| CanonicalEvent::Delta { text })
    }
}

impl ChunkNormalizer for NdjsonNormalizer {
    fn feed(&mut self, chunk: &[u8]) -> Vec<CanonicalEvent> {
        if self.terminal {
            return Vec::new();
        }

        let mut events = Vec::new();
        for line in self.lines.push(chunk) {
            if self.terminal {
                break;
            }
            if let Some(event) = self.normalize_line(&line) {
                self.terminal = event.is_terminal();
                events.push(event);
            }
        }
        events
    }

    fn finish(&mut self) -> Vec<CanonicalEvent> {
        if self.terminal {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(line) = self.lines.drain() {
            if let Some(event) = self.normalize_line(&line) {
                self.terminal = event.is_terminal();
                events.push(event);
            }
        }
        if !self.terminal {
            self.terminal = true;
            events.push(CanonicalEvent::Done);
        }
        events
    }
}
