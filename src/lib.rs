//! Model Gateway Library
//!
//! Fronts many LLM backends behind one canonical chat contract, with
//! streaming normalization and token/cost accounting.

pub mod accounting;
pub mod backends;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::{GatewayConfig, Settings};
pub use handlers::{create_router, AppState};
pub use models::{CanonicalChatRequest, CanonicalEvent, ChatPayload, ModelBinding};
pub use services::{DispatchOutcome, Dispatcher, RelayState, StreamRelay};
pub use utils::error::{GatewayError, GatewayResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
