//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use pinlink_protocol::Packet;
use std::sync::atomic::{AtomicU32, Ordering};

/// High-level client for driving pinlink outputs.
pub struct Client {
    conn: Connection,
    /// Last pattern this client requested, for read-modify-write helpers.
    /// Client-side bookkeeping only; the server holds the real pin state.
    last_pattern: AtomicU32,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Connection::new(config),
            last_pattern: AtomicU32::new(0),
        }
    }

    /// Connects to the server (single attempt).
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) {
        self.conn.close().await
    }

    /// Sends one output pattern. No retry: the first failure is returned
    /// and the session is left disconnected.
    pub async fn set_pattern(&self, pattern: u32) -> Result<(), ClientError> {
        self.conn.send(&Packet::outputs(pattern)).await?;
        self.last_pattern.store(pattern, Ordering::SeqCst);
        Ok(())
    }

    /// Sends one output pattern, reconnecting on failure.
    ///
    /// After a failed send the session is re-established with up to
    /// `retry.max_attempts` sequential attempts, each preceded by closing
    /// the stale socket and a fixed delay, and the pattern is sent again.
    /// Retried sends are at-least-once: a packet that reached the server
    /// before the failure was detected may be applied twice.
    pub async fn set_pattern_with_retry(&self, pattern: u32) -> Result<(), ClientError> {
        let first_err = match self.conn.send(&Packet::outputs(pattern)).await {
            Ok(()) => {
                self.last_pattern.store(pattern, Ordering::SeqCst);
                return Ok(());
            }
            Err(e) => e,
        };

        if !first_err.is_retryable() {
            return Err(first_err);
        }

        let retry = self.conn.config().retry.clone();
        tracing::warn!(
            "Send failed ({}), reconnecting (max {} attempts)",
            first_err,
            retry.max_attempts
        );

        for attempt in 1..=retry.max_attempts {
            self.conn.close().await;
            tokio::time::sleep(retry.delay).await;

            tracing::debug!("Reconnect attempt {}/{}", attempt, retry.max_attempts);
            match self.conn.connect().await {
                Ok(()) => match self.conn.send(&Packet::outputs(pattern)).await {
                    Ok(()) => {
                        self.last_pattern.store(pattern, Ordering::SeqCst);
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::warn!("Resend failed on attempt {}: {}", attempt, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Reconnect attempt {} failed: {}", attempt, e);
                }
            }
        }

        Err(ClientError::RetriesExhausted {
            attempts: retry.max_attempts,
        })
    }

    /// Turns a single output on or off, keeping the other bits of the last
    /// requested pattern. `index` must be below 32 (the pattern width).
    pub async fn set_output(&self, index: u8, on: bool) -> Result<(), ClientError> {
        let current = self.last_pattern.load(Ordering::SeqCst);
        let bit = 1u32 << index;
        let pattern = if on { current | bit } else { current & !bit };
        self.set_pattern(pattern).await
    }

    /// Turns every output off.
    pub async fn all_off(&self) -> Result<(), ClientError> {
        self.set_pattern(0).await
    }

    /// Last pattern successfully requested by this client.
    pub fn last_pattern(&self) -> u32 {
        self.last_pattern.load(Ordering::SeqCst)
    }
}
