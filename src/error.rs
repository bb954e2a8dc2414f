use std::time::Duration;
use thiserror::Error;

/// Main error type for followgraph
#[derive(Error, Debug)]
pub enum FollowGraphError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A single outbound call failed at the transport level
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-retryable status
    #[error("Upstream rejected request with status {status}")]
    Rejected {
        status: u16,
        /// Parsed JSON body, when the upstream sent one
        body: Option<serde_json::Value>,
    },

    /// Response body was not the JSON we expected
    #[error("Decode error: {0}")]
    Decode(String),

    /// Request gateway gave up after its retry budget
    #[error("Request to {url} failed after {attempts} attempts: {message}")]
    TransportExhausted {
        url: String,
        attempts: usize,
        message: String,
    },

    /// Relationship backend never became ready; aborts the whole build
    #[error("Relationship backend unreachable: {0}")]
    BackendUnreachable(String),

    /// The whole build exceeded its deadline
    #[error("Graph build exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FollowGraphError {
    /// Whether the request gateway should try the call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Decode(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Convenient Result type using FollowGraphError
pub type Result<T> = std::result::Result<T, FollowGraphError>;
