use thiserror::Error;

/// Errors raised by the task store (tasks, messages, pending-delivery rows,
/// and the session/user-profile lookups the [`crate::client::TaskStoreClient`]
/// composes over).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("session error: {0}")]
    Session(#[from] skynet_sessions::SessionError),

    #[error("user error: {0}")]
    User(#[from] skynet_users::UserError),
}

impl StoreError {
    /// Stable code surfaced in client-facing JSON error bodies and log fields.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "DATABASE_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::TaskNotFound { .. } => "TASK_NOT_FOUND",
            StoreError::InvalidTime(_) => "INVALID_TIME",
            StoreError::InvalidPatch(_) => "INVALID_PATCH",
            StoreError::Session(_) => "SESSION_ERROR",
            StoreError::User(_) => "USER_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
