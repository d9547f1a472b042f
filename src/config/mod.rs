//! Configuration management module
//!
//! JSON binding store plus environment-derived runtime settings.

pub mod file;
pub mod settings;

pub use file::{BindingRecord, GatewayConfig, ServerConfig};
pub use settings::Settings;
