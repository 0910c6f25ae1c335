//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("size mismatch for {digest}: manifest declares {expected}, stored object has {actual}")]
    SizeMismatch {
        digest: String,
        expected: u64,
        actual: u64,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
