//! Server error types.

use std::net::SocketAddr;
use thiserror::Error;

/// Server errors.
///
/// Only `Bind` is fatal to a listener; every other variant is scoped to a
/// single connection and never affects the accept loop or other handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] pinlink_protocol::ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("WebSocket handshake failed: {0}")]
    WsHandshake(String),

    #[error("WebSocket error: {0}")]
    Ws(String),

    #[error("server shutting down")]
    ShuttingDown,
}
