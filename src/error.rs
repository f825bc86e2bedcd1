use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::BalancingStrategy;

/// Application-wide error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Service not found")]
    RouteNotFound,

    #[error("Service '{service}' has no upstream targets")]
    NoUpstreamTargets { service: String },

    #[error("Service '{service}' uses unsupported balancing strategy: {strategy}")]
    UnsupportedStrategy {
        service: String,
        strategy: BalancingStrategy,
    },

    #[error("No targets available")]
    NoTargetsAvailable,

    #[error("Invalid upstream URL '{target}': {reason}")]
    InvalidTargetUrl { target: String, reason: String },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal gateway error: {0}")]
    Internal(String),

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::NoUpstreamTargets { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::UnsupportedStrategy { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NoTargetsAvailable => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidTargetUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound => "ROUTE_NOT_FOUND",
            GatewayError::NoUpstreamTargets { .. } => "NO_UPSTREAM_TARGETS",
            GatewayError::UnsupportedStrategy { .. } => "UNSUPPORTED_STRATEGY",
            GatewayError::NoTargetsAvailable => "NO_TARGETS_AVAILABLE",
            GatewayError::InvalidTargetUrl { .. } => "INVALID_TARGET_URL",
            GatewayError::Upstream(_) => "UPSTREAM_ERROR",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
            GatewayError::Bind { .. } => "BIND_ERROR",
            GatewayError::Io(_) => "IO_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
