//! Upstream HTTP client
//!
//! Sends encoded wire requests to backends. One client for non-streaming
//! calls and one with a longer timeout for streaming calls.

use crate::backends::WireRequest;
use crate::models::wire::WireErrorEnvelope;
use crate::utils::error::{GatewayError, GatewayResult};
use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Upstream byte stream: raw wire chunks in arrival order
pub type ChunkStream = Pin<Box<dyn Stream<Item = GatewayResult<Vec<u8>>> + Send>>;

/// HTTP client for backend calls
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    stream_client: Client,
}

impl UpstreamClient {
    /// Create a new client with the given timeouts (seconds)
    pub fn new(timeout_secs: u64, stream_timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("modelgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let stream_client = Client::builder()
            .timeout(Duration::from_secs(stream_timeout_secs))
            .user_agent(concat!("modelgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
        })
    }

    fn builder(&self, wire: &WireRequest, streaming: bool) -> reqwest::RequestBuilder {
        let client = if streaming {
            &self.stream_client
        } else {
            &self.client
        };

        let mut builder = client
            .post(&wire.url)
            .header("Content-Type", "application/json")
            .json(&wire.body);

        if let Some(token) = &wire.bearer {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if wire.accept_sse {
            builder = builder.header("Accept", "text/event-stream");
        }
        builder
    }

    /// Send a non-streaming request and return the reply body
    pub async fn send(&self, wire: &WireRequest) -> GatewayResult<serde_json::Value> {
        debug!("sending upstream request to {}", wire.url);

        let response = self.builder(wire, false).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| GatewayError::UpstreamProtocol(format!("unreadable reply: {}", e)))?;
            debug!("upstream request completed");
            return Ok(body);
        }

        let text = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &text))
    }

    /// Open a streaming request and return the raw chunk stream
    pub async fn open_stream(&self, wire: &WireRequest) -> GatewayResult<ChunkStream> {
        debug!("opening upstream stream to {}", wire.url);

        let response = self.builder(wire, true).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &text));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| GatewayError::UpstreamTransport(e.to_string()))
        });

        Ok(Box::pin(stream))
    }
}

/// Map an upstream non-2xx reply onto the error taxonomy: a well-formed
/// error envelope passes its message through, anything else is a transport
/// failure.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> GatewayError {
    if let Ok(envelope) = serde_json::from_str::<WireErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return GatewayError::UpstreamProtocol(envelope.error.message);
        }
    }
    GatewayError::UpstreamTransport(format!("{}: {}", status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(UpstreamClient::new(30, 300).is_ok());
    }

    #[test]
    fn test_classify_error_envelope() {
        let error = classify_failure(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"type":"rate_limit","message":"slow down"}}"#,
        );
        assert!(matches!(error, GatewayError::UpstreamProtocol(m) if m == "slow down"));
    }

    #[test]
    fn test_classify_opaque_failure() {
        let error = classify_failure(reqwest::StatusCode::BAD_GATEWAY, "<html>nope</html>");
        assert!(matches!(error, GatewayError::UpstreamTransport(_)));
    }
}
