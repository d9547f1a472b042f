//! Canonical data model
//!
//! The internal vocabulary every backend is translated into: one request
//! shape going out, one event shape coming back.

use serde::{Deserialize, Serialize};

/// Message role in a chat conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Backend wire protocol family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-style /chat/completions with SSE streaming
    ChatCompletions,
    /// OpenAI-style /responses with typed SSE events
    Responses,
    /// Local model speaking newline-delimited JSON
    LocalNdjson,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::ChatCompletions => "chat_completions",
            BackendKind::Responses => "responses",
            BackendKind::LocalNdjson => "local_ndjson",
        }
    }
}

/// Whether a binding's wire shape is negotiable per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMode {
    /// The request's `use_responses` hint may switch a chat-completions
    /// binding to the responses wire shape.
    #[default]
    Auto,
    /// The configured kind is final; per-request hints are ignored.
    Forced,
}

/// Resolved backend configuration for a logical model reference.
///
/// Looked up fresh for every request so it always reflects the current
/// binding store; never cached beyond request scope.
#[derive(Debug, Clone)]
pub struct ModelBinding {
    /// Stable binding id
    pub id: String,
    /// Logical key callers address the binding by
    pub key: String,
    /// Model name the backend understands
    pub model: String,
    /// Wire protocol family
    pub kind: BackendKind,
    /// Backend base URL
    pub base_url: String,
    /// Resolved credential, if the binding has one
    pub credential: Option<String>,
    pub wire_mode: WireMode,
    /// Reasoning-class models reject temperature and use a different
    /// token-budget parameter name
    pub supports_reasoning: bool,
    pub price_input_per_million: Option<f64>,
    pub price_output_per_million: Option<f64>,
    pub currency: String,
}

impl ModelBinding {
    /// Whether any pricing is configured for this binding
    pub fn has_pricing(&self) -> bool {
        self.price_input_per_million.is_some() || self.price_output_per_million.is_some()
    }
}

/// Canonical chat request, built once per inbound call and read-only
/// thereafter.
#[derive(Debug, Clone)]
pub struct CanonicalChatRequest {
    pub binding: ModelBinding,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    /// Effective reasoning flag: binding.supports_reasoning OR the
    /// request's reasoning hint
    pub reasoning: bool,
}

impl CanonicalChatRequest {
    /// Total characters across all message contents, for accounting
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }
}

/// The single event vocabulary all backend adapters produce and all
/// relay/accounting logic consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalEvent {
    Delta { text: String },
    Done,
    Error { message: String },
}

impl CanonicalEvent {
    /// Done and Error end the event stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CanonicalEvent::Delta { .. })
    }
}
