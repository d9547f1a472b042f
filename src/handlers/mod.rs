//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod chat;
pub mod health;

use crate::accounting::{JsonlUsageSink, UsageSink};
use crate::config::{GatewayConfig, Settings};
use crate::services::{Dispatcher, UpstreamClient};
use crate::utils::events::DispatchLog;
use anyhow::Result;
use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub dispatcher: Dispatcher,
    pub events: Arc<DispatchLog>,
}

/// Create application router
pub async fn create_router(settings: Settings, config: GatewayConfig) -> Result<Router> {
    let config = Arc::new(config);

    let client = UpstreamClient::new(settings.upstream.timeout, settings.upstream.stream_timeout)?;
    let sink: Arc<dyn UsageSink> =
        Arc::new(JsonlUsageSink::new(settings.accounting.usage_log.clone()));
    let events = Arc::new(DispatchLog::new(settings.accounting.events_capacity));

    let dispatcher = Dispatcher::new(config.clone(), client, sink, events.clone());

    let app_state = Arc::new(AppState {
        config,
        dispatcher,
        events,
    });

    // Create middleware stack
    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::middleware::request_logging_middleware,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Create routes
    let router = Router::new()
        .route("/v1/chat", post(chat::handle_chat))
        .route("/v1/models", get(chat::list_models))
        .route("/v1/events", get(chat::recent_events))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .with_state(app_state)
        .layer(middleware_stack);

    Ok(router)
}
