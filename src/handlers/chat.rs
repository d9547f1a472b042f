//! Chat dispatch handler
//!
//! POST /v1/chat — accepts the canonical inbound payload, dispatches it to
//! the resolved backend, and returns either a JSON reply or an SSE stream
//! of framed events terminated by connection close.

use crate::handlers::AppState;
use crate::models::api::{ChatPayload, StreamFrame};
use crate::services::DispatchOutcome;
use crate::utils::error::GatewayError;
use crate::utils::logging::chat_payload_summary;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

/// Handle chat requests
pub async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<Response, GatewayError> {
    if let Ok(summary) = serde_json::to_string(&chat_payload_summary(&payload)) {
        debug!("inbound chat request: {}", summary);
    }

    match state.dispatcher.dispatch(payload).await? {
        DispatchOutcome::Reply(reply) => Ok(Json(reply).into_response()),
        DispatchOutcome::Stream(rx) => {
            let stream = ReceiverStream::new(rx).map(|event| {
                let frame = StreamFrame::from(event);
                let event = match serde_json::to_string(&frame) {
                    Ok(json) => Event::default().data(json),
                    Err(e) => Event::default()
                        .data(format!(r#"{{"type":"error","message":"{}"}}"#, e)),
                };
                Ok::<_, axum::Error>(event)
            });

            let sse = Sse::new(stream).keep_alive(
                KeepAlive::new()
                    .interval(Duration::from_secs(15))
                    .text("keep-alive"),
            );

            debug!("starting streaming response transmission");
            Ok(sse.into_response())
        }
    }
}

/// List configured binding keys
///
/// GET /v1/models
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "models": state.config.list_keys() }))
}

/// Recent dispatch events from the observability ring
///
/// GET /v1/events
pub async fn recent_events(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "events": state.events.recent() }))
}
