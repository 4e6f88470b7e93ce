use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("row not found: {0}")]
    NotFound(String),
    #[error("duplicate uq_hash: {0}")]
    DuplicateHash(String),
    #[error("edge not found between {low} and {high}")]
    EdgeNotFound { low: i64, high: i64 },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StoreError::Backend(msg.into())
    }
}
