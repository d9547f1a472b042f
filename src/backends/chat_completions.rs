//! Chat-completions adapter
//!
//! OpenAI-style /chat/completions: messages pass through verbatim, the
//! streaming reply is newline-delimited `data: <json>` frames ending with a
//! `[DONE]` sentinel.

use super::{BackendAdapter, ChunkNormalizer, LineBuffer, WireRequest};
use crate::models::canonical::{BackendKind, CanonicalChatRequest, CanonicalEvent};
use crate::models::wire::{
    ChatCompletionsChunk, ChatCompletionsRequest, ChatCompletionsResponse, WireChatMessage,
    WireUsage,
};
use crate::utils::error::{GatewayError, GatewayResult};
use tracing::{debug, warn};

/// Chat-completions backend adapter
pub struct ChatCompletionsAdapter;

impl ChatCompletionsAdapter {
    fn build_url(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}

impl BackendAdapter for ChatCompletionsAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::ChatCompletions
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

        // Reasoning-class models reject temperature and take their token
        // budget through max_completion_tokens instead of max_tokens.
        let wire = if request.reasoning {
            ChatCompletionsRequest {
                model: request.binding.model.clone(),
                messages,
                max_tokens: None,
                max_completion_tokens: request.max_tokens,
                temperature: None,
                stream: request.stream.then_some(true),
            }
        } else {
            ChatCompletionsRequest {
                model: request.binding.model.clone(),
                messages,
                max_tokens: request.max_tokens,
                max_completion_tokens: None,
                temperature: request.temperature,
                stream: request.stream.then_some(true),
            }
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
        Box::new(SseNormalizer::default())
    }

    fn extract_completion(&self, body: &serde_json::Value) -> GatewayResult<String> {
        let reply: ChatCompletionsResponse = serde_json::from_value(body.clone())
            .map_err(|e| GatewayError::UpstreamProtocol(format!("unexpected reply shape: {}", e)))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .ok_or_else(|| GatewayError::UpstreamProtocol("reply carried no choices".to_string()))
    }

    fn authoritative_usage(&self, body: &serde_json::Value) -> Option<WireUsage> {
        body.get("usage")
            .and_then(|usage| serde_json::from_value(usage.clone()).ok())
    }
}

/// Normalizer for SSE `data:` frames
#[derive(Default)]
struct SseNormalizer {
    lines: LineBuffer,
    terminal: bool,
}

impl SseNormalizer {
    fn normalize_line(&mut self, line: &str) -> Option<CanonicalEvent> {
        let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
        let data = data.trim();

        if data == "[DONE]" {
            debug!("chat-completions stream end marker");
            return Some(CanonicalEvent::Done);
        }

        match serde_json::from_str::<ChatCompletionsChunk>(data) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    return Some(CanonicalEvent::Error {
                        message: error.message,
                    });
                }
                chunk
                    .choices
                    .first()
                    .and_then(|choice| choice.delta.content.clone())
                    .filter(|text| !text.is_empty())
                    .map(|text| CanonicalEvent::Delta { text })
            }
            Err(e) => {
                // One malformed frame must not kill the stream
                warn!("skipping malformed chat-completions frame: {} - data: {}", e, data);
                None
            }
        }
    }
}

impl ChunkNormalizer for SseNormalizer {
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
        // A stream that ends cleanly without [DONE] still completes
        if !self.terminal {
            self.terminal = true;
            events.push(CanonicalEvent::Done);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::canonical::{ChatMessage, ModelBinding, Role, WireMode};

    fn test_binding(reasoning: bool) -> ModelBinding {
        ModelBinding {
            id: "b-1".into(),
            key: "fast".into(),
            model: "gpt-4o-mini".into(),
            kind: BackendKind::ChatCompletions,
            base_url: "https://api.openai.com/v1".into(),
            credential: Some("sk-test".into()),
            wire_mode: WireMode::Auto,
            supports_reasoning: reasoning,
            price_input_per_million: None,
            price_output_per_million: None,
            currency: "USD".into(),
        }
    }

    fn test_request(reasoning: bool) -> CanonicalChatRequest {
        CanonicalChatRequest {
            binding: test_binding(reasoning),
            messages: vec![ChatMessage::new(Role::User, "hello")],
            temperature: Some(0.7),
            max_tokens: Some(100),
            stream: false,
            reasoning,
        }
    }

    #[test]
    fn test_encode_regular_model() {
        let adapter = ChatCompletionsAdapter;
        let wire = adapter.encode(&test_request(false)).unwrap();

        assert_eq!(wire.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(wire.bearer.as_deref(), Some("sk-test"));
        assert_eq!(wire.body["max_tokens"], 100);
        assert_eq!(wire.body["temperature"], 0.7f32);
        assert!(wire.body.get("max_completion_tokens").is_none());
        assert_eq!(wire.body["messages"][0]["role"], "user");
        assert_eq!(wire.body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_encode_reasoning_model() {
        let adapter = ChatCompletionsAdapter;
        let wire = adapter.encode(&test_request(true)).unwrap();

        // Reasoning models: budget moves to max_completion_tokens,
        // temperature is dropped entirely.
        assert_eq!(wire.body["max_completion_tokens"], 100);
        assert!(wire.body.get("max_tokens").is_none());
        assert!(wire.body.get("temperature").is_none());
    }

    #[test]
    fn test_normalize_delta_and_done() {
        let mut normalizer = SseNormalizer::default();
        let events = normalizer.feed(
            b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        );
        assert_eq!(
            events,
            vec![
                CanonicalEvent::Delta { text: "Hel".into() },
                CanonicalEvent::Delta { text: "lo".into() },
                CanonicalEvent::Done,
            ]
        );
        // Nothing after the terminal
        assert!(normalizer.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n").is_empty());
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn test_normalize_frame_split_across_chunks() {
        let mut normalizer = SseNormalizer::default();
        assert!(normalizer.feed(b"data: {\"choices\":[{\"del").is_empty());
        let events = normalizer.feed(b"ta\":{\"content\":\"joined\"}}]}\n");
        assert_eq!(
            events,
            vec![CanonicalEvent::Delta {
                text: "joined".into()
            }]
        );
    }

    #[test]
    fn test_normalize_malformed_frame_skipped() {
        let mut normalizer = SseNormalizer::default();
        let events = normalizer.feed(
            b"data: {not json}\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        );
        assert_eq!(events, vec![CanonicalEvent::Delta { text: "ok".into() }]);
    }

    #[test]
    fn test_implicit_done_on_clean_end() {
        let mut normalizer = SseNormalizer::default();
        normalizer.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n");
        assert_eq!(normalizer.finish(), vec![CanonicalEvent::Done]);
    }

    #[test]
    fn test_normalize_error_frame() {
        let mut normalizer = SseNormalizer::default();
        let events =
            normalizer.feed(b"data: {\"error\":{\"type\":\"overloaded\",\"message\":\"busy\"}}\n");
        assert_eq!(
            events,
            vec![CanonicalEvent::Error {
                message: "busy".into()
            }]
        );
        assert!(normalizer.finish().is_empty());
    }

    #[test]
    fn test_extract_completion() {
        let adapter = ChatCompletionsAdapter;
        let body = serde_json::json!({
            "id": "cmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
        });
        assert_eq!(adapter.extract_completion(&body).unwrap(), "Hi there");

        let usage = adapter.authoritative_usage(&body).unwrap();
        assert_eq!(usage.input_tokens, 9);
        assert_eq!(usage.output_tokens, 3);
    }

    #[test]
    fn test_extract_completion_no_choices() {
        let adapter = ChatCompletionsAdapter;
        let body = serde_json::json!({"id": "cmpl-1", "choices": []});
        assert!(adapter.extract_completion(&body).is_err());
    }
}
