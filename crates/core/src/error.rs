use thiserror::Error;

pub type RecsResult<T> = Result<T, RecsError>;

#[derive(Error, Debug)]
pub enum RecsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Product/event store error: {0}")]
    Store(String),

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Intent provider error: {0}")]
    Intent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
