use std::io;
use thiserror::Error;

/// Error taxonomy for the sync plane. Variants classify *kinds* of failure,
/// not concrete source types, so callers can decide retry/status policy
/// without inspecting the underlying cause.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing config section, unknown topology `type`, or a missing
    /// required schema key. Fatal at load.
    #[error("config error: {0}")]
    Config(String),

    /// Rules rejected the record, the circuit is open, or the rate
    /// limiter tripped. Never fatal for the process.
    #[error("admission rejected: {0}")]
    AdmissionRejected(String),

    /// Adapter I/O or an HTTP 5xx. Worth retrying.
    #[error("transient I/O error: {0}")]
    TransientIo(String),

    /// HTTP 4xx (other than 429) or a malformed payload. Not retried.
    #[error("permanent I/O error: {0}")]
    PermanentIo(String),

    /// The adapter does not implement the requested capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("wrapped error: {0}")]
    Wrapped(#[from] io::Error),
}

impl SyncError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SyncError::Config(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        SyncError::Unsupported(msg.into())
    }

    pub fn admission<S: Into<String>>(msg: S) -> Self {
        SyncError::AdmissionRejected(msg.into())
    }

    /// True when a `RetryManager` should attempt this error again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransientIo(_))
    }
}

impl From<String> for SyncError {
    fn from(s: String) -> Self {
        SyncError::TransientIo(s)
    }
}

impl From<&str> for SyncError {
    fn from(s: &str) -> Self {
        SyncError::TransientIo(s.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::PermanentIo(format!("malformed json: {err}"))
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::TransientIo(format!("sqlite error: {err}"))
    }
}

impl From<tokio_postgres::Error> for SyncError {
    fn from(err: tokio_postgres::Error) -> Self {
        SyncError::TransientIo(format!("postgres error: {err}"))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 || status.is_server_error() => {
                SyncError::TransientIo(format!("http error: {err}"))
            }
            Some(_) => SyncError::PermanentIo(format!("http error: {err}")),
            None => SyncError::TransientIo(format!("http error: {err}")),
        }
    }
}
