//! Model Gateway Server
//!
//! HTTP gateway that lets callers address many LLM backends through one
//! canonical request/response contract, with token and cost accounting.

use anyhow::{Context, Result};
use tracing::info;

mod accounting;
mod backends;
mod config;
mod handlers;
mod middleware;
mod models;
mod services;
mod utils;

use config::{GatewayConfig, Settings};
use handlers::create_router;

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    // Load binding configuration from JSON file (required)
    let gateway_config =
        GatewayConfig::load_default().context("Failed to load binding configuration")?;

    info!("Binding configuration loaded");

    // Load additional settings from environment (timeouts, accounting, logging)
    let settings = Settings::new().context("Failed to load server settings")?;
    info!("Server settings loaded");

    let addr = format!(
        "{}:{}",
        gateway_config.server.host, gateway_config.server.port
    );

    // Create router
    let app = create_router(settings, gateway_config).await?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Model gateway started");
    info!("Health check: http://{}/health", addr);
    info!("Chat endpoint: http://{}/v1/chat", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}

/// Initialize logging system
fn init_logging() {
    // Get log level from environment variable, default to info
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    // Check if JSON format should be used
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if log_format == "json" {
        // JSON format logs (production environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .finish(),
        )
    } else {
        // Human readable format (development environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(log_level)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Logging system initialized");
}
