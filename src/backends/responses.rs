//! Responses adapter
//!
//! OpenAI-style /responses: the request carries an `input` item list
//! instead of `messages`, and streaming events are discriminated by a
//! `type` field. The same logical backend has shipped incompatible
//! non-streaming payload shapes across versions, so extraction tries each
//! known shape in a fixed fallback order.

use super::{BackendAdapter, ChunkNormalizer, LineBuffer, WireRequest};
use crate::models::canonical::{BackendKind, CanonicalChatRequest, CanonicalEvent, Role};
use crate::models::wire::{ResponsesRequest, WireUsage};
use crate::utils::error::{GatewayError, GatewayResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Responses backend adapter
pub struct ResponsesAdapter;

impl ResponsesAdapter {
    fn build_url(base_url: &str) -> String {
        format!("{}/responses", base_url.trim_end_matches('/'))
    }
}

impl BackendAdapter for ResponsesAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Responses
    }

    fn encode(&self, request: &CanonicalChatRequest) -> GatewayResult<WireRequest> {
        let mut input: Vec<Value> = Vec::new();
        let mut instructions: Option<String> = None;

        for message in &request.messages {
            match message.role {
                // System prompt is lifted out into the instructions field
                Role::System => {
                    instructions = Some(message.content.clone());
                }
                Role::Assistant => {
                    input.push(serde_json::json!({
                        "role": "assistant",
                        "content": [{ "type": "output_text", "text": message.content }]
                    }));
                }
                Role::User | Role::Tool => {
                    input.push(serde_json::json!({
                        "role": "user",
                        "content": [{ "type": "input_text", "text": message.content }]
                    }));
                }
            }
        }

        let wire = ResponsesRequest {
            model: request.binding.model.clone(),
            input,
            max_output_tokens: request.max_tokens,
            // Reasoning-class models reject temperature here too
            temperature: if request.reasoning {
                None
            } else {
                request.temperature
            },
            stream: request.stream.then_some(true),
            instructions,
        };

        Ok(WireRequest {
            url: Self::build_url(&request.binding.base_url),
            body: serde_json::to_value(&wire)
                .map_err(|e| GatewayError::Encode(e.to_string()))?,
            bearer: request.binding.credential.clone(),
            accept_sse: request.stream,
        })
    }

    fn normalizer(&self) -> Box<dyn ChunkNormalizer> {
        Box::new(ResponsesNormalizer::default())
    }

    fn extract_completion(&self, body: &Value) -> GatewayResult<String> {
        extract_output_text(body).ok_or_else(|| {
            GatewayError::UpstreamProtocol("no text found in responses reply".to_string())
        })
    }

    fn authoritative_usage(&self, body: &Value) -> Option<WireUsage> {
        body.get("usage")
            .and_then(|usage| serde_json::from_value(usage.clone()).ok())
    }
}

// The three reply shapes this backend has shipped, tried in order.

/// Shape 1: flat `output_text` string array
#[derive(Deserialize)]
struct FlatReply {
    output_text: Vec<String>,
}

/// Shape 2: nested `output[].content[]` items of kind text/output_text
#[derive(Deserialize)]
struct NestedReply {
    output: Vec<NestedOutputItem>,
}

#[derive(Deserialize)]
struct NestedOutputItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: Option<Vec<NestedContentItem>>,
}

#[derive(Deserialize)]
struct NestedContentItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Shape 3: bare `content` or `text` string field
#[derive(Deserialize)]
struct BareReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Scan a non-streaming responses reply for its text, across the known
/// payload shapes in fallback order.
pub fn extract_output_text(body: &Value) -> Option<String> {
    if let Ok(reply) = serde_json::from_value::<FlatReply>(body.clone()) {
        if !reply.output_text.is_empty() {
            return Some(reply.output_text.concat());
        }
    }

    if let Ok(reply) = serde_json::from_value::<NestedReply>(body.clone()) {
        let mut text = String::new();
        for item in reply.output {
            if item.kind.as_deref() == Some("message") || item.kind.is_none() {
                for content in item.content.unwrap_or_default() {
                    if matches!(content.kind.as_str(), "text" | "output_text") {
                        if let Some(part) = content.text {
                            text.push_str(&part);
                        }
                    }
                }
            }
        }
        if !text.is_empty() {
            return Some(text);
        }
    }

    if let Ok(reply) = serde_json::from_value::<BareReply>(body.clone()) {
        if let Some(text) = reply.content.or(reply.text) {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}

/// Normalizer for typed responses SSE events
#[derive(Default)]
struct ResponsesNormalizer {
    lines: LineBuffer,
    terminal: bool,
}

impl ResponsesNormalizer {
    fn normalize_line(&mut self, line: &str) -> Option<CanonicalEvent> {
        let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
        let data = data.trim();

        if data == "[DONE]" {
            return Some(CanonicalEvent::Done);
        }

        let event: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                warn!("skipping malformed responses frame: {} - data: {}", e, data);
                return None;
            }
        };

        let event_type = event.get("type").and_then(|t| t.as_str()).unwrap_or("");
        match event_type {
            "response.output_text.delta" => event
                .get("delta")
                .and_then(|delta| delta.as_str())
                .map(|text| CanonicalEvent::Delta {
                    text: text.to_string(),
                }),
            "response.completed" | "response.done" => Some(CanonicalEvent::Done),
            "error" => Some(CanonicalEvent::Error {
                message: event
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("upstream error")
                    .to_string(),
            }),
            _ => {
                // Any event carrying an error object is terminal too
                if let Some(error) = event.get("error").filter(|e| !e.is_null()) {
                    let message = error
                        .get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("upstream error")
                        .to_string();
                    return Some(CanonicalEvent::Error { message });
                }
                debug!("ignoring responses event type: {}", event_type);
                None
            }
        }
    }
}

impl ChunkNormalizer for ResponsesNormalizer {
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
