//! Backend wire data models
//!
//! Request and reply structures for the three supported wire families.
//! Reply structs are deliberately lenient (`#[serde(default)]` everywhere)
//! since backends have shipped incompatible payload shapes across versions.

use serde::{Deserialize, Serialize};

// ====== chat-completions wire ======

/// OpenAI-style /chat/completions request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionsRequest {
    pub model: String,
    pub messages: Vec<WireChatMessage>,
    /// Token budget for regular models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Token budget for reasoning-class models, which reject `max_tokens`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChatMessage {
    pub role: String,
    pub content: String,
}

/// Non-streaming /chat/completions reply
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionsResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<WireChatMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One streamed /chat/completions chunk (the JSON inside a `data:` frame)
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionsChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
    #[serde(default)]
    pub error: Option<WireError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

// ====== responses wire ======

/// OpenAI-style /responses request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    /// Input items: role/content messages with typed content parts
    pub input: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// System message lifted out of the message list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// ====== local NDJSON wire ======

/// Chat request for a local NDJSON backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NdjsonRequest {
    pub model: String,
    pub messages: Vec<WireChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<NdjsonOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NdjsonOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// One line of an NDJSON reply stream
#[derive(Debug, Clone, Deserialize)]
pub struct NdjsonLine {
    #[serde(default)]
    pub message: Option<NdjsonMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Authoritative prompt token count, present on the final line of
    /// non-streaming replies
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NdjsonMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

// ====== shared ======

/// Backend-reported token usage.
///
/// Chat-completions replies spell the fields prompt/completion, responses
/// replies spell them input/output; both land here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireUsage {
    #[serde(alias = "prompt_tokens")]
    pub input_tokens: u32,
    #[serde(alias = "completion_tokens")]
    pub output_tokens: u32,
}

/// Well-formed upstream error envelope: `{"error": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct WireErrorEnvelope {
    pub error: WireError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
