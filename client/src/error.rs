/// Error types for the Duet client
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuetError {
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("state error: {0}")]
    State(String),
}

pub type Result<T> = std::result::Result<T, DuetError>;
