//! Inbound and outbound API data models
//!
//! Defines the request payload callers send to the gateway and the framed
//! events streamed back to them.

use crate::models::canonical::{CanonicalEvent, ChatMessage};
use serde::{Deserialize, Serialize};

/// Inbound chat request
///
/// POST /v1/chat
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatPayload {
    /// Backend model name (lowest-precedence reference)
    pub model: Option<String>,
    /// Logical binding key
    pub model_key: Option<String>,
    /// Explicit binding id (highest-precedence reference)
    pub model_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
    /// Hint to use the responses wire shape on an auto-mode binding
    #[serde(default)]
    pub use_responses: bool,
    /// Request reasoning-class encoding for this call
    #[serde(default)]
    pub reasoning: bool,
    pub metadata: Option<serde_json::Value>,
}

impl ChatPayload {
    pub fn model_ref(&self) -> ModelRef {
        ModelRef {
            id: self.model_id.clone(),
            key: self.model_key.clone(),
            name: self.model.clone(),
        }
    }
}

/// A logical model reference carrying up to three identifiers.
///
/// Precedence is strict: id > key > name. The first identifier present is
/// authoritative; lower-precedence ones are ignored even if resolution by
/// it fails.
#[derive(Debug, Clone, Default)]
pub struct ModelRef {
    pub id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
}

impl ModelRef {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.key.is_none() && self.name.is_none()
    }

    /// Best identifier for log/error messages
    pub fn display(&self) -> &str {
        self.id
            .as_deref()
            .or(self.key.as_deref())
            .or(self.name.as_deref())
            .unwrap_or("<none>")
    }
}

/// One framed event of the streaming reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Delta { content: String },
    Done,
    Error { message: String },
}

impl From<CanonicalEvent> for StreamFrame {
    fn from(event: CanonicalEvent) -> Self {
        match event {
            CanonicalEvent::Delta { text } => StreamFrame::Delta { content: text },
            CanonicalEvent::Done => StreamFrame::Done,
            CanonicalEvent::Error { message } => StreamFrame::Error { message },
        }
    }
}

/// Non-streaming reply body
///
/// Chat-completions and local backends reply with plain `{content}`; a
/// responses-style backend passes its normalized payload through verbatim.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatReply {
    Text { content: String },
    Raw(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::canonical::Role;

    #[test]
    fn test_payload_deserialization() {
        let payload: ChatPayload = serde_json::from_str(
            r#"{
                "model_key": "fast",
                "messages": [{"role": "user", "content": "hello"}],
                "stream": true
            }"#,
        )
        .unwrap();

        assert_eq!(payload.model_key.as_deref(), Some("fast"));
        assert!(payload.stream);
        assert!(!payload.use_responses);
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].role, Role::User);
    }

    #[test]
    fn test_model_ref_precedence_fields() {
        let payload: ChatPayload = serde_json::from_str(
            r#"{"model_id": "b-1", "model_key": "fast", "model": "gpt-4o", "messages": []}"#,
        )
        .unwrap();
        let reference = payload.model_ref();
        assert_eq!(reference.id.as_deref(), Some("b-1"));
        assert_eq!(reference.key.as_deref(), Some("fast"));
        assert_eq!(reference.name.as_deref(), Some("gpt-4o"));
        assert_eq!(reference.display(), "b-1");
    }

    #[test]
    fn test_stream_frame_serialization() {
        let delta = StreamFrame::Delta {
            content: "hi".into(),
        };
        assert_eq!(
            serde_json::to_string(&delta).unwrap(),
            r#"{"type":"delta","content":"hi"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamFrame::Done).unwrap(),
            r#"{"type":"done"}"#
        );
    }

    #[test]
    fn test_frame_from_event() {
        let frame: StreamFrame = CanonicalEvent::Error {
            message: "boom".into(),
        }
        .into();
        assert_eq!(
            frame,
            StreamFrame::Error {
                message: "boom".into()
            }
        );
    }
}
