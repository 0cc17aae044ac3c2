use std::sync::PoisonError;
use thiserror::Error;

/// Error type for durable store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A value could not be serialized for persistence
    #[error("failed to encode value for key \"{key}\": {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },

    /// A stored value could not be decoded
    #[error("failed to decode value for key \"{key}\": {source}")]
    Deserialize {
        key: String,
        source: serde_json::Error,
    },

    /// The store document itself could not be encoded
    #[error("failed to encode store document: {0}")]
    Document(serde_json::Error),

    /// The backing file could not be read or written
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock error
    #[error("store lock error: {0}")]
    Lock(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(error: PoisonError<T>) -> Self {
        StoreError::Lock(error.to_string())
    }
}
