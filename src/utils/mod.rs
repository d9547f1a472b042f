//! Utility module
//!
//! Error taxonomy, dispatch event ring buffer, and logging helpers.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{GatewayError, GatewayResult};
pub use events::{DispatchEvent, DispatchLog};
