//! Client error types.

use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("connect timeout")]
    Timeout,

    #[error("reconnect attempts exhausted after {attempts} tries")]
    RetriesExhausted { attempts: u32 },
}

impl ClientError {
    /// Returns whether a reconnect could plausibly clear this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Timeout
                | ClientError::ConnectionClosed
                | ClientError::NotConnected
        )
    }
}
