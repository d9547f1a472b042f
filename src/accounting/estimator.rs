//! Token and cost estimator
//!
//! Counts prompt and completion tokens with the subword encoding implied
//! by the model name, and derives monetary cost from the binding's price
//! table. The chat counting adds a fixed per-message framing overhead, so
//! the figures are a close approximation of vendor billing, not exact
//! billing truth. When a backend reports authoritative usage, those token
//! counts win; cost is still computed locally (a backend's own cost figure
//! is never trusted).

use crate::models::canonical::{ChatMessage, ModelBinding};
use crate::models::wire::WireUsage;
use tiktoken_rs::{cl100k_base_singleton, o200k_base_singleton};

/// Framing overhead added per message before encoding role and content
const TOKENS_PER_MESSAGE: u32 = 4;
/// Every reply is primed with a fixed assistant preamble
const REPLY_PRIMER_TOKENS: u32 = 3;

/// Estimated or backend-reported usage for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Monetary cost; None when the binding has no pricing configured
    pub cost: Option<f64>,
    /// True when the token counts were estimated rather than reported
    pub estimated: bool,
}

/// Subword encoding families used by the current backend set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodingFamily {
    O200k,
    Cl100k,
}

/// Select an encoding family by model-name convention. Unknown models get
/// the more common family in the current backend set.
fn family_for_model(model: &str) -> EncodingFamily {
    let name = model.to_ascii_lowercase();

    const O200K_PREFIXES: &[&str] = &["gpt-4o", "gpt-4.1", "gpt-5", "chatgpt-4o", "o1", "o3", "o4"];
    const CL100K_PREFIXES: &[&str] = &["gpt-4", "gpt-3.5", "text-davinci", "davinci"];

    if O200K_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return EncodingFamily::O200k;
    }
    if CL100K_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return EncodingFamily::Cl100k;
    }
    EncodingFamily::O200k
}

fn count_text(family: EncodingFamily, text: &str) -> u32 {
    let tokens = match family {
        EncodingFamily::O200k => o200k_base_singleton().lock().encode_with_special_tokens(text),
        EncodingFamily::Cl100k => cl100k_base_singleton().lock().encode_with_special_tokens(text),
    };
    tokens.len() as u32
}

/// Count prompt tokens for a chat message list
pub fn count_prompt_tokens(model: &str, messages: &[ChatMessage]) -> u32 {
    let family = family_for_model(model);

    let mut total = 0;
    for message in messages {
        total += TOKENS_PER_MESSAGE;
        total += count_text(family, message.role.as_str());
        total += count_text(family, &message.content);
    }
    total + REPLY_PRIMER_TOKENS
}

/// Count completion tokens for plain text
pub fn count_completion_tokens(model: &str, text: &str) -> u32 {
    count_text(family_for_model(model), text)
}

/// Round to six decimal places, the resolution of the price table
fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Cost of the given token counts under the binding's price table.
/// None when no pricing is configured, distinguishing "free" from
/// "unpriced".
pub fn cost_for(binding: &ModelBinding, input_tokens: u32, output_tokens: u32) -> Option<f64> {
    if !binding.has_pricing() {
        return None;
    }

    let input_price = binding.price_input_per_million.unwrap_or(0.0);
    let output_price = binding.price_output_per_million.unwrap_or(0.0);
    Some(round6(
        input_tokens as f64 * input_price / 1e6 + output_tokens as f64 * output_price / 1e6,
    ))
}

/// Estimate usage for a completed request.
///
/// `reported` carries the backend's own usage figure when the reply had
/// one; it overrides the estimated token counts.
pub fn estimate(
    messages: &[ChatMessage],
    completion: &str,
    binding: &ModelBinding,
    reported: Option<WireUsage>,
) -> Usage {
    let (input_tokens, output_tokens, estimated) = match reported {
        Some(usage) => (usage.input_tokens, usage.output_tokens, false),
        None => (
            count_prompt_tokens(&binding.model, messages),
            count_completion_tokens(&binding.model, completion),
            true,
        ),
    };

    Usage {
        input_tokens,
        output_tokens,
        cost: cost_for(binding, input_tokens, output_tokens),
        estimated,
    }
}
