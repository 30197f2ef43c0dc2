use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Session-gateway error kinds (`SPEC_FULL.md` §7). Transport-closed is the
/// only variant that propagates out of a session's three tasks and ends it;
/// everything else is localized to the frame or tool call that produced it.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport closed")]
    TransportClosed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("live model session error: {0}")]
    LiveModel(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] skynet_tasks::StoreError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] skynet_scheduler::SchedulerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Stable code surfaced in client-facing JSON error bodies and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::TransportClosed => "TRANSPORT_CLOSED",
            GatewayError::MalformedEnvelope(_) => "MALFORMED_ENVELOPE",
            GatewayError::LiveModel(_) => "LIVE_MODEL_ERROR",
            GatewayError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            GatewayError::Scheduler(_) => "SCHEDULER_ERROR",
            GatewayError::Serialization(_) => "SERIALIZATION_ERROR",
            GatewayError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl IntoResponse for GatewayError {
    /// REST handlers (`SPEC_FULL.md` §6) propagate store/scheduler failures
    /// with `?` and let this turn them into the `{"error", "code"}` body
    /// shape used across the gateway's HTTP surface.
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::TransportClosed => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::MalformedEnvelope(_) => StatusCode::BAD_REQUEST,
            GatewayError::LiveModel(_) => StatusCode::BAD_GATEWAY,
            GatewayError::StoreUnavailable(skynet_tasks::StoreError::TaskNotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            GatewayError::StoreUnavailable(skynet_tasks::StoreError::InvalidTime(_))
            | GatewayError::StoreUnavailable(skynet_tasks::StoreError::InvalidPatch(_)) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Scheduler(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Serialization(_) => StatusCode::BAD_REQUEST,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string(), "code": self.code() }));
        (status, body).into_response()
    }
}
