use thiserror::Error;

/// Top-level error kinds shared across crates that don't own a more
/// specific error enum of their own (store crates have their own; this one
/// covers configuration, the gateway's transport/protocol layer, and the
/// dispatcher). See `SPEC_FULL.md` §7 for the error-kind taxonomy this
/// mirrors.
#[derive(Debug, Error)]
pub enum SkynetError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport closed")]
    TransportClosed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("tool extraction failed: {0}")]
    ToolExtractionFailed(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("duplicate request")]
    Duplicate,

    #[error("queue broker failure: {0}")]
    QueueBroker(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SkynetError {
    /// Stable code surfaced in logs and in client-facing JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SkynetError::Config(_) => "CONFIG_ERROR",
            SkynetError::TransportClosed => "TRANSPORT_CLOSED",
            SkynetError::MalformedEnvelope(_) => "MALFORMED_ENVELOPE",
            SkynetError::ToolExtractionFailed(_) => "TOOL_EXTRACTION_FAILED",
            SkynetError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            SkynetError::InvalidTime(_) => "INVALID_TIME",
            SkynetError::Duplicate => "DUPLICATE_REQUEST",
            SkynetError::QueueBroker(_) => "QUEUE_BROKER_FAILURE",
            SkynetError::Serialization(_) => "SERIALIZATION_ERROR",
            SkynetError::Io(_) => "IO_ERROR",
            SkynetError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SkynetError>;
