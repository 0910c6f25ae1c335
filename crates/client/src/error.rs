//! Client error types.

use thiserror::Error;

/// Errors returned by the push client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The push server rejected a request.
    #[error("server error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The storage gateway rejected a presigned PUT.
    #[error("storage error ({status}) {code} for {url}: {message}")]
    Storage {
        status: u16,
        url: String,
        code: String,
        message: String,
    },

    #[error("storage response for {0} carried no ETag")]
    MissingEtag(String),

    #[error("push canceled")]
    Canceled,

    /// Consecutive rounds left the same requirements outstanding.
    #[error("push made no progress with {0} requirements outstanding")]
    NoProgress(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether retrying the failed operation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Api { status, .. } | ClientError::Storage { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
