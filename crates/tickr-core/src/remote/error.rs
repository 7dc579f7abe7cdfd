//! Remote store errors

use thiserror::Error;

/// Errors returned by a [`RemoteStore`](super::RemoteStore)
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport-level failure (DNS, connect, timeout, TLS)
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Remote store error ({status}): {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Realtime channel failure
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Store is unreachable
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Backend URL or key missing from configuration
    #[error("Backend not configured: {0}")]
    NotConfigured(&'static str),
}

impl RemoteError {
    /// Whether retrying later might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(e) => e.is_timeout() || e.is_connect(),
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Realtime(_) | RemoteError::Unavailable(_) => true,
            RemoteError::Decode(_) | RemoteError::NotConfigured(_) => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RemoteError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        RemoteError::Realtime(e.to_string())
    }
}
