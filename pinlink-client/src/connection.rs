//! Connection management.

use crate::error::ClientError;
use pinlink_protocol::Packet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Reconnect policy used by send-with-retry.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum reconnect attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay before each reconnect attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// How long the post-send liveness probe waits for evidence of a
    /// closed peer before declaring the send good.
    pub probe_timeout: Duration,
    /// Reconnect policy used by send-with-retry.
    pub retry: RetryPolicy,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A connection to a pinlink server.
///
/// The session is disconnected until [`connect`](Self::connect) succeeds,
/// and again after a failed send or an explicit [`close`](Self::close).
pub struct Connection {
    config: ConnectionConfig,
    stream: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Connects to the server.
    ///
    /// A single attempt: failures are returned to the caller without
    /// retrying. Any previous stream is replaced.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        stream.set_nodelay(true).ok();

        *self.stream.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);

        tracing::debug!("Connected to {}", self.config.addr);
        Ok(())
    }

    /// Encodes and writes one packet, then probes link liveness.
    ///
    /// The server sends nothing back, so an early EOF is the only readable
    /// evidence that the peer is gone: the probe peeks for it within
    /// `probe_timeout`. EOF or a write error transitions the session to
    /// disconnected and fails the send; the probe timing out means alive.
    pub async fn send(&self, packet: &Packet) -> Result<(), ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let encoded = packet.encode();
        tracing::debug!(
            "Sending packet: object_id={} field_a={:#06b}",
            packet.object_id,
            packet.field_a
        );

        if let Err(e) = stream.write_all(&encoded).await {
            drop(guard);
            self.close().await;
            return Err(ClientError::Io(e));
        }

        let mut probe = [0u8; 1];
        match tokio::time::timeout(self.config.probe_timeout, stream.peek(&mut probe)).await {
            // No EOF within the probe window: peer alive, send stands.
            Err(_) => Ok(()),
            Ok(Ok(0)) => {
                tracing::debug!("Liveness probe saw EOF");
                drop(guard);
                self.close().await;
                Err(ClientError::ConnectionClosed)
            }
            // Unexpected inbound data; the link is alive regardless.
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                drop(guard);
                self.close().await;
                Err(ClientError::Io(e))
            }
        }
    }

    /// Closes the connection. Safe to call when already disconnected.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut stream) = self.stream.lock().await.take() {
            let _ = stream.shutdown().await;
            tracing::debug!("Connection closed");
        }
    }

    /// Returns whether the session is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The configuration this connection was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn fast_config(addr: SocketAddr) -> ConnectionConfig {
        ConnectionConfig::new(addr)
            .with_connect_timeout(Duration::from_millis(500))
            .with_probe_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("127.0.0.1:50002".parse().unwrap())
            .with_connect_timeout(Duration::from_secs(2))
            .with_retry(RetryPolicy {
                max_attempts: 5,
                delay: Duration::from_millis(10),
            });
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[tokio::test]
    async fn test_connect_failure_stays_disconnected() {
        // Nothing listens on the ephemeral port we just released.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let conn = Connection::new(fast_config(addr));
        assert!(conn.connect().await.is_err());
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let conn = Connection::new(fast_config("127.0.0.1:1".parse().unwrap()));
        let result = conn.send(&Packet::outputs(0b01)).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_send_reaches_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; pinlink_protocol::PACKET_SIZE];
            stream.read_exact(&mut buf).await.unwrap();
            buf
        });

        let conn = Connection::new(fast_config(addr));
        conn.connect().await.unwrap();
        conn.send(&Packet::outputs(0b10)).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, Packet::outputs(0b10).encode());

        conn.close().await;
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_probe_detects_closed_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let conn = Connection::new(fast_config(addr));
        conn.connect().await.unwrap();

        // Accept and immediately drop the server side.
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = conn.send(&Packet::outputs(0b01)).await;
        assert!(result.is_err());
        assert!(!conn.is_connected());
    }
}
