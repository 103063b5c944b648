//! Error types for request building and execution

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Result type for bling operations
pub type Result<T> = std::result::Result<T, BlingError>;

/// How a structured decode went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The payload is not well-formed JSON (syntax error or premature EOF)
    Malformed,
    /// The payload is valid JSON but does not fit the target type
    Mismatch,
}

impl From<&serde_json::Error> for DecodeErrorKind {
    fn from(err: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof => DecodeErrorKind::Malformed,
            Category::Data | Category::Io => DecodeErrorKind::Mismatch,
        }
    }
}

/// Errors raised while building, sending or decoding a request
#[derive(Debug, Error)]
pub enum BlingError {
    /// A file used as request body could not be read
    #[error("Failed to read body file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The value handed to `body` is not a supported body source
    #[error("Unsupported body type: {0}")]
    UnsupportedBodyType(String),

    /// Header name or value rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A JSON body could not be serialized
    #[error("Failed to serialize body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The transport failed to deliver the request
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Verb, URL or body could not be turned into a transport request
    #[error("Failed to construct request: {0}")]
    RequestConstruction(String),

    /// The response body could not be buffered
    #[error("Failed to read response body: {0}")]
    BodyRead(String),

    /// The buffered body could not be decoded into the requested type
    #[error("Failed to decode response body ({kind:?}): {source}")]
    Decode {
        kind: DecodeErrorKind,
        #[source]
        source: serde_json::Error,
    },

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Retry limit exceeded
    #[error("Retry limit exceeded after {attempts} attempts: {last}")]
    RetryLimitExceeded {
        attempts: u32,
        #[source]
        last: Box<BlingError>,
    },

    /// Invalid proxy configuration
    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    /// Client build error
    #[error("Failed to build HTTP client: {0}")]
    BuildError(String),
}

impl From<reqwest::Error> for BlingError {
    fn from(err: reqwest::Error) -> Self {
        BlingError::Transport(Box::new(err))
    }
}

impl BlingError {
    /// Wrap any error raised by a custom transport
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BlingError::Transport(Box::new(err))
    }

    pub(crate) fn decode(source: serde_json::Error) -> Self {
        BlingError::Decode {
            kind: DecodeErrorKind::from(&source),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            BlingError::Transport(inner) => match inner.downcast_ref::<reqwest::Error>() {
                // Retry on network errors, not on redirect or decode failures
                Some(e) => e.is_timeout() || e.is_connect() || e.is_request(),
                None => true,
            },
            BlingError::Timeout(_) => true,
            _ => false,
        }
    }
}
