use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown registry: {name}")]
    UnknownRegistry { name: String },

    #[error("Invalid schema context '{context}': {cause}")]
    InvalidContext { context: String, cause: String },

    #[error("Registry '{registry}' is read-only: {operation} rejected")]
    ReadOnlyRegistry { registry: String, operation: String },

    #[error("Gateway is in global read-only mode: {operation} rejected")]
    ReadOnlyMode { operation: String },

    #[error("Insufficient scope for {operation}: requires '{required}'")]
    InsufficientScope { operation: String, required: String },

    #[error("Registry '{registry}' rejected the operation: {reason}")]
    UpstreamRejected { registry: String, reason: String },

    #[error("Registry '{registry}' unavailable: {cause}")]
    UpstreamUnavailable { registry: String, cause: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl GatewayError {
    /// Stable wire name for this error kind, used in HTTP error responses
    /// and per-item batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownRegistry { .. } => "unknown_registry",
            GatewayError::InvalidContext { .. } => "invalid_context",
            GatewayError::ReadOnlyRegistry { .. } => "read_only_registry",
            GatewayError::ReadOnlyMode { .. } => "read_only_mode",
            GatewayError::InsufficientScope { .. } => "insufficient_scope",
            GatewayError::UpstreamRejected { .. } => "upstream_rejected",
            GatewayError::UpstreamUnavailable { .. } => "upstream_unavailable",
            GatewayError::InvalidRequest { .. } => "invalid_request",
            GatewayError::Configuration { .. } => "configuration_error",
        }
    }

    /// The registry this error is attributed to, when one was resolved
    /// before the failure.
    pub fn registry(&self) -> Option<&str> {
        match self {
            GatewayError::ReadOnlyRegistry { registry, .. }
            | GatewayError::UpstreamRejected { registry, .. }
            | GatewayError::UpstreamUnavailable { registry, .. } => Some(registry),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::UnknownRegistry { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidContext { .. } | GatewayError::InvalidRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::ReadOnlyRegistry { .. }
            | GatewayError::ReadOnlyMode { .. }
            | GatewayError::InsufficientScope { .. } => StatusCode::FORBIDDEN,
            GatewayError::UpstreamRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            registry: self.registry().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
