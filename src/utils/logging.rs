//! Logging utilities
//!
//! Helpers for summarizing inbound payloads in debug logs without dumping
//! whole conversations.

use crate::models::ChatPayload;

/// Truncate a string with a note about the original length
pub fn truncate_content(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... ({} chars truncated)", &s[..cut], s.len() - cut)
    } else {
        s.to_string()
    }
}

/// Create a filtered summary of an inbound chat payload for logging
pub fn chat_payload_summary(payload: &ChatPayload) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = payload
        .messages
        .iter()
        .map(|message| {
            serde_json::json!({
                "role": message.role.as_str(),
                "content": truncate_content(&message.content, 200),
            })
        })
        .collect();

    serde_json::json!({
        "model": payload.model,
        "model_key": payload.model_key,
        "model_id": payload.model_id,
        "max_tokens": payload.max_tokens,
        "temperature": payload.temperature,
        "stream": payload.stream,
        "use_responses": payload.use_responses,
        "reasoning": payload.reasoning,
        "messages": messages,
    })
}
