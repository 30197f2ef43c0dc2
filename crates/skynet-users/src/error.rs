use thiserror::Error;

/// Kept separate from `SkynetError` so callers can distinguish "no such
/// user" from a generic store failure without coupling layers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, UserError>;
