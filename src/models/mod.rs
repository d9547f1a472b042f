//! Data model module
//!
//! Canonical internal types, inbound/outbound API types, and backend wire
//! structures.

pub mod api;
pub mod canonical;
pub mod wire;

pub use api::{ChatPayload, ChatReply, ModelRef, StreamFrame};
pub use canonical::{
    BackendKind, CanonicalChatRequest, CanonicalEvent, ChatMessage, ModelBinding, Role, WireMode,
};
