//! Error handling module
//!
//! Defines the gateway error taxonomy and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway error taxonomy
///
/// Resolver and pre-flight failures fail fast before any streaming begins;
/// once streaming has begun, failures become terminal stream events instead
/// of HTTP errors. Individual malformed wire chunks are never an error at
/// this level: they are skipped and logged where they are parsed.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// No binding matched the model reference; no upstream call was made
    #[error("model not configured: {0}")]
    ModelNotConfigured(String),

    /// Inbound request failed validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or connect failure talking to the backend
    #[error("upstream transport error: {0}")]
    UpstreamTransport(String),

    /// Backend returned a well-formed error envelope; message passed through
    #[error("upstream error: {0}")]
    UpstreamProtocol(String),

    /// Canonical request could not be encoded for the backend
    #[error("failed to encode wire request: {0}")]
    Encode(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::UpstreamTransport(err.to_string())
    }
}

/// Error body returned to callers: `{type:"error", error:{type, message}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl GatewayError {
    /// HTTP status code for the synchronous (pre-stream) rendering
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::ModelNotConfigured(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamTransport(_) | GatewayError::UpstreamProtocol(_) => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Encode(_)
            | GatewayError::Serialization(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::ModelNotConfigured(_) => "model_not_configured",
            GatewayError::InvalidRequest(_) => "invalid_request_error",
            GatewayError::UpstreamTransport(_) => "upstream_transport_error",
            GatewayError::UpstreamProtocol(_) => "upstream_error",
            GatewayError::Encode(_)
            | GatewayError::Serialization(_)
            | GatewayError::Internal(_) => "api_error",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: "error".to_string(),
            error: ErrorDetail {
                error_type: self.error_type().to_string(),
                message: self.to_string(),
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            GatewayError::ModelNotConfigured(_) | GatewayError::InvalidRequest(_) => {
                tracing::warn!("client error: {} - status: {}", self, status)
            }
            _ => tracing::error!("gateway error: {} - status: {}", self, status),
        }

        (status, Json(self.to_body())).into_response()
    }
}

/// Result type alias
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            GatewayError::ModelNotConfigured("ghost".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::InvalidRequest("empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::UpstreamTransport("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::UpstreamProtocol("overloaded".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::Internal("oops".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            GatewayError::ModelNotConfigured("ghost".into()).error_type(),
            "model_not_configured"
        );
        assert_eq!(
            GatewayError::UpstreamProtocol("x".into()).error_type(),
            "upstream_error"
        );
        assert_eq!(GatewayError::Encode("x".into()).error_type(), "api_error");
    }

    #[test]
    fn test_error_body_shape() {
        let body = GatewayError::ModelNotConfigured("ghost-model".into()).to_body();
        assert_eq!(body.kind, "error");
        assert_eq!(body.error.error_type, "model_not_configured");
        assert!(body.error.message.contains("ghost-model"));
    }

    #[test]
    fn test_resolver_miss_distinct_from_upstream() {
        // A resolver miss must stay client-visible as 4xx, never blended
        // with upstream failures.
        let miss = GatewayError::ModelNotConfigured("ghost".into());
        let upstream = GatewayError::UpstreamTransport("connect refused".into());
        assert!(miss.status_code().is_client_error());
        assert!(upstream.status_code().is_server_error());
        assert_ne!(miss.error_type(), upstream.error_type());
    }
}
