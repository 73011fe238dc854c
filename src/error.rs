use thiserror::Error;

#[derive(Error, Debug)]
pub enum BucketError {
    #[error("Destination not found: {0}")]
    DestinationNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External service failure: {0}")]
    External(String),

    #[error("No publish history for destination: {0}")]
    NoHistory(String),

    #[error("Already at oldest history entry")]
    AtOldest,

    #[error("Already at newest history entry")]
    AtNewest,
}

pub type Result<T> = std::result::Result<T, BucketError>;
