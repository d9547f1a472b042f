//! Dispatch orchestrator
//!
//! Ties the pipeline together per request: resolve the binding, build the
//! canonical request, select the adapter, then either await and normalize
//! a single reply or open a stream relay. Exactly one usage record is
//! written for every request that reached the backend call; resolver and
//! pre-flight failures fail fast and write none.

use crate::accounting::{estimate, record_usage, UsageRecord, UsageSink};
use crate::backends::{adapter_for, BackendAdapter};
use crate::config::GatewayConfig;
use crate::models::api::{ChatPayload, ChatReply};
use crate::models::canonical::{
    BackendKind, CanonicalChatRequest, CanonicalEvent, ModelBinding, WireMode,
};
use crate::models::wire::WireUsage;
use crate::services::client::UpstreamClient;
use crate::services::relay::StreamRelay;
use crate::services::resolver::ModelResolver;
use crate::utils::error::{GatewayError, GatewayResult};
use crate::utils::events::{DispatchEvent, DispatchLog};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Downstream channel capacity; a full channel pauses the upstream read
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// What a dispatch produced
pub enum DispatchOutcome {
    /// Non-streaming reply body
    Reply(ChatReply),
    /// Streaming session; events arrive on the receiver
    Stream(mpsc::Receiver<CanonicalEvent>),
}

/// Per-request orchestrator over resolver, adapters, relay, and accounting
#[derive(Clone)]
pub struct Dispatcher {
    resolver: ModelResolver,
    client: UpstreamClient,
    sink: Arc<dyn UsageSink>,
    events: Arc<DispatchLog>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<GatewayConfig>,
        client: UpstreamClient,
        sink: Arc<dyn UsageSink>,
        events: Arc<DispatchLog>,
    ) -> Self {
        Self {
            resolver: ModelResolver::new(config),
            client,
            sink,
            events,
        }
    }

    /// Handle one inbound chat request
    pub async fn dispatch(&self, payload: ChatPayload) -> GatewayResult<DispatchOutcome> {
        let correlation_id = Uuid::new_v4();

        validate_payload(&payload)?;

        let binding = match self.resolver.resolve(&payload.model_ref()) {
            Ok(binding) => binding,
            Err(error) => {
                self.events.push(DispatchEvent::new(
                    correlation_id,
                    "resolver",
                    format!("miss: {}", payload.model_ref().display()),
                ));
                return Err(error);
            }
        };

        let kind = effective_kind(&binding, &payload);
        let adapter = adapter_for(kind);
        let request = build_request(binding, &payload);

        self.events.push(DispatchEvent::new(
            correlation_id,
            "dispatch",
            format!(
                "binding={} kind={} stream={}",
                request.binding.key,
                kind.as_str(),
                request.stream
            ),
        ));

        if request.stream {
            self.dispatch_stream(adapter, request, payload, correlation_id)
                .await
        } else {
            self.dispatch_reply(adapter, request, payload, correlation_id)
                .await
        }
    }

    /// Non-streaming path: await the single reply and normalize it
    async fn dispatch_reply(
        &self,
        adapter: &'static dyn BackendAdapter,
        request: CanonicalChatRequest,
        payload: ChatPayload,
        correlation_id: Uuid,
    ) -> GatewayResult<DispatchOutcome> {
        let wire = adapter.encode(&request)?;

        let body = match self.client.send(&wire).await {
            Ok(body) => body,
            Err(error) => {
                // The backend call was made; it still gets a record
                self.events.push(DispatchEvent::new(
                    correlation_id,
                    "upstream",
                    format!("failed: {}", error),
                ));
                self.account(&request, "", None, &payload, correlation_id, Some(&error))
                    .await;
                return Err(error);
            }
        };

        // Responses backends pass the raw normalized payload through; text
        // extraction is still needed for accounting.
        let (reply, completion) = match adapter.kind() {
            BackendKind::Responses => {
                let completion = adapter.extract_completion(&body).unwrap_or_default();
                (ChatReply::Raw(body.clone()), completion)
            }
            _ => {
                let completion = match adapter.extract_completion(&body) {
                    Ok(text) => text,
                    Err(error) => {
                        self.account(&request, "", None, &payload, correlation_id, Some(&error))
                            .await;
                        return Err(error);
                    }
                };
                (
                    ChatReply::Text {
                        content: completion.clone(),
                    },
                    completion,
                )
            }
        };

        let reported = adapter.authoritative_usage(&body);
        self.account(
            &request,
            &completion,
            reported,
            &payload,
            correlation_id,
            None,
        )
        .await;

        Ok(DispatchOutcome::Reply(reply))
    }

    /// Streaming path: open the relay and account when it finishes
    async fn dispatch_stream(
        &self,
        adapter: &'static dyn BackendAdapter,
        request: CanonicalChatRequest,
        payload: ChatPayload,
        correlation_id: Uuid,
    ) -> GatewayResult<DispatchOutcome> {
        let wire = adapter.encode(&request)?;

        // Connect failures before any byte went downstream are synchronous
        let upstream = match self.client.open_stream(&wire).await {
            Ok(upstream) => upstream,
            Err(error) => {
                self.events.push(DispatchEvent::new(
                    correlation_id,
                    "upstream",
                    format!("connect failed: {}", error),
                ));
                self.account(&request, "", None, &payload, correlation_id, Some(&error))
                    .await;
                return Err(error);
            }
        };

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let relay = StreamRelay::new(adapter.normalizer());

        let dispatcher = self.clone();
        tokio::spawn(async move {
            let outcome = relay.pump(upstream, tx).await;

            dispatcher.events.push(DispatchEvent::new(
                correlation_id,
                "relay",
                format!("finished: {:?}", outcome.state),
            ));

            // Whatever accumulated up to the terminal state is accounted,
            // including on client disconnect.
            dispatcher
                .account(
                    &request,
                    &outcome.completion,
                    None,
                    &payload,
                    correlation_id,
                    None,
                )
                .await;
        });

        Ok(DispatchOutcome::Stream(rx))
    }

    async fn account(
        &self,
        request: &CanonicalChatRequest,
        completion: &str,
        reported: Option<WireUsage>,
        payload: &ChatPayload,
        correlation_id: Uuid,
        error: Option<&GatewayError>,
    ) {
        let usage = estimate(&request.messages, completion, &request.binding, reported);

        let metadata = match (payload.metadata.clone(), error) {
            (metadata, None) => metadata,
            (Some(mut metadata), Some(error)) => {
                if let Some(object) = metadata.as_object_mut() {
                    object.insert("error".to_string(), error.to_string().into());
                }
                Some(metadata)
            }
            (None, Some(error)) => Some(serde_json::json!({ "error": error.to_string() })),
        };

        let record = UsageRecord {
            binding_key: request.binding.key.clone(),
            model: request.binding.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            prompt_chars: request.prompt_chars(),
            completion_chars: completion.len(),
            cost: usage.cost,
            currency: request.binding.currency.clone(),
            estimated: usage.estimated,
            correlation_id,
            metadata,
            created_at: Utc::now(),
        };

        debug!(
            "usage for {}: in={} out={} cost={:?} estimated={}",
            correlation_id, record.input_tokens, record.output_tokens, record.cost, record.estimated
        );
        record_usage(self.sink.as_ref(), record).await;

        self.events.push(DispatchEvent::new(
            correlation_id,
            "usage",
            format!("in={} out={}", usage.input_tokens, usage.output_tokens),
        ));
    }
}

/// Effective wire family for this request. An auto-mode chat-completions
/// binding may be switched to the responses shape by the caller's hint; a
/// forced binding keeps its configured kind.
fn effective_kind(binding: &ModelBinding, payload: &ChatPayload) -> BackendKind {
    if binding.kind == BackendKind::ChatCompletions
        && binding.wire_mode == WireMode::Auto
        && payload.use_responses
    {
        return BackendKind::Responses;
    }
    binding.kind
}

fn build_request(binding: ModelBinding, payload: &ChatPayload) -> CanonicalChatRequest {
    let reasoning = binding.supports_reasoning || payload.reasoning;
    CanonicalChatRequest {
        binding,
        messages: payload.messages.clone(),
        temperature: payload.temperature,
        max_tokens: payload.max_tokens,
        stream: payload.stream,
        reasoning,
    }
}

fn validate_payload(payload: &ChatPayload) -> GatewayResult<()> {
    if payload.messages.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "message list cannot be empty".to_string(),
        ));
    }

    if let Some(temperature) = payload.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(GatewayError::InvalidRequest(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
    }

    if payload.max_tokens == Some(0) {
        return Err(GatewayError::InvalidRequest(
            "max_tokens must be greater than 0".to_string(),
        ));
    }

    if payload.model_ref().is_empty() {
        warn!("request carried no model reference");
        return Err(GatewayError::InvalidRequest(
            "one of model, model_key, model_id is required".to_string(),
        ));
    }

    Ok(())
}
