use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid document path: {0}")]
    InvalidPath(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("failed to decode document {id}: {message}")]
    Decode { id: String, message: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}
