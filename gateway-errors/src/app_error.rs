use serde_json::Value;

/// Placeholder used when no request id is available.
pub const UNKNOWN_REQUEST_ID: &str = "-";

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("stream=true not supported yet")]
    StreamNotSupported,

    #[error("{message}")]
    Timeout { attempts: u32, message: String },

    #[error("Upstream HTTP {status}: {body}")]
    Upstream { status: u16, body: Value },

    #[error("Upstream returned an unreadable body: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Error type tag placed in the `type` field of the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::StreamNotSupported => "bad_request",
            Self::Timeout { .. } => "timeout",
            Self::Upstream { status, .. } if (400..500).contains(status) => "upstream_4xx",
            Self::Upstream { .. } => "upstream_5xx",
            Self::InvalidUpstreamResponse(_) | Self::Transport(_) => "bad_gateway",
            Self::Config(_) => "internal_error",
        }
    }

    /// HTTP status the front door answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::StreamNotSupported => 400,
            Self::Timeout { .. } => 504,
            Self::Upstream { status, .. } if (400..500).contains(status) => 400,
            Self::Upstream { .. } => 502,
            Self::InvalidUpstreamResponse(_) | Self::Transport(_) => 502,
            Self::Config(_) => 500,
        }
    }

    /// Payload for the `message` field. Upstream failures echo the upstream body.
    pub fn message(&self) -> Value {
        match self {
            Self::Upstream { body, .. } => body.clone(),
            other => Value::String(other.to_string()),
        }
    }

    /// Rejected before any upstream I/O.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::StreamNotSupported)
    }

    pub fn with_request_id(self, request_id: impl Into<String>) -> RequestError {
        RequestError {
            error: self,
            request_id: request_id.into(),
        }
    }
}

/// An [`AppError`] tagged with the id of the request that produced it.
#[derive(Debug, Clone)]
pub struct RequestError {
    pub error: AppError,
    pub request_id: String,
}

impl From<AppError> for RequestError {
    fn from(error: AppError) -> Self {
        error.with_request_id(UNKNOWN_REQUEST_ID)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: Value,
    pub request_id: String,
}

impl From<&RequestError> for ErrorBody {
    fn from(err: &RequestError) -> Self {
        Self {
            kind: err.error.kind(),
            message: err.error.message(),
            request_id: err.request_id.clone(),
        }
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::{AppError, ErrorBody, RequestError};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    impl IntoResponse for RequestError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorBody::from(&self))).into_response()
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            RequestError::from(self).into_response()
        }
    }
}
