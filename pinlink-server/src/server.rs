//! TCP server implementation.

use crate::error::ServerError;
use crate::handler::PacketDispatcher;
use crate::outputs::OutputSink;
use crate::session::Session;
use pinlink_protocol::FrameAssembler;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Per-connection read timeout; bounds every receive wait so handlers
    /// can observe shutdown.
    pub read_timeout: Duration,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{}", pinlink_protocol::DEFAULT_PORT)
                .parse()
                .unwrap(),
            read_timeout: Duration::from_secs(1),
            max_connections: 64,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub packets_total: AtomicU64,
    pub decode_errors_total: AtomicU64,
}

/// TCP server for pinlink.
///
/// Accepts stream connections and spawns one handler task per connection.
/// Handlers share nothing with each other except the output sink, which
/// serializes its own mutation.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<PacketDispatcher>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server driving the given output sink.
    pub fn new(config: ServerConfig, sink: Arc<OutputSink>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            dispatcher: Arc::new(PacketDispatcher::new(sink)),
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and runs the accept loop.
    ///
    /// A bind failure is fatal and is not retried; every later error is
    /// scoped to a single connection.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: self.config.bind_addr,
                source: e,
            })?;
        self.run_on(listener).await
    }

    /// Runs the accept loop on an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let dispatcher = self.dispatcher.clone();
                            let stats = self.stats.clone();
                            let read_timeout = self.config.read_timeout;
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    stream,
                                    addr,
                                    dispatcher,
                                    stats.clone(),
                                    read_timeout,
                                    &mut conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!("[{}] Connection error: {}", addr, e);
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!("Client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Handles a single connection: bounded-wait read loop, frame assembly,
    /// packet dispatch.
    ///
    /// The socket is released on every exit path when `stream` drops.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Arc<PacketDispatcher>,
        stats: Arc<ServerStats>,
        read_timeout: Duration,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let session = Session::new(addr);
        tracing::info!("Client connected: {} (session {})", addr, session.id);

        let mut assembler = FrameAssembler::new();
        let mut buf = [0u8; 1024];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] Connection closed by peer", addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::debug!("[{}] Received {} bytes", addr, n);
                            session.record_activity();
                            assembler.feed(&buf[..n]);
                        }
                        Err(e) => {
                            tracing::warn!("[{}] Read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }
                _ = tokio::time::sleep(read_timeout) => {
                    // Bounded wait elapsed with no data; loop back so the
                    // shutdown branch stays observable. Not an error.
                    tracing::trace!("[{}] Read timeout, no data", addr);
                    continue;
                }
                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Err(ServerError::ShuttingDown);
                }
            }

            // Drain every fully-formed packet, each dispatched independently.
            loop {
                match assembler.try_extract() {
                    Ok(Some(packet)) => {
                        session.record_packet();
                        stats.packets_total.fetch_add(1, Ordering::Relaxed);
                        dispatcher.dispatch(&session, &packet);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        // Malformed packets are skipped; the connection
                        // stays open.
                        session.record_decode_error();
                        stats.decode_errors_total.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!("[{}] Dropping malformed packet: {}", addr, e);
                    }
                }
            }
        }
    }

    /// Initiates server shutdown.
    ///
    /// Active handlers observe the signal within one read-timeout interval;
    /// none are killed mid-dispatch.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// The shutdown channel, for auxiliary listeners that should stop with
    /// this server.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// The dispatcher shared by every connection handler.
    pub fn dispatcher(&self) -> &Arc<PacketDispatcher> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::SimulatedGpio;
    use pinlink_protocol::Packet;
    use tokio::io::AsyncWriteExt;

    fn test_sink() -> Arc<OutputSink> {
        Arc::new(OutputSink::new(vec![5, 6], Box::new(SimulatedGpio::new())))
    }

    async fn spawn_server(sink: Arc<OutputSink>) -> (Arc<Server>, SocketAddr) {
        let mut config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        config.read_timeout = Duration::from_millis(50);
        let server = Arc::new(Server::new(config, sink));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let run_server = server.clone();
        tokio::spawn(async move {
            let _ = run_server.run_on(listener).await;
        });

        (server, addr)
    }

    async fn wait_for_states(sink: &OutputSink, expected: &[bool]) -> bool {
        for _ in 0..100 {
            if sink.states() == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn test_server_not_running_initially() {
        let server = Server::new(ServerConfig::default(), test_sink());
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_end_to_end_dispatch() {
        let sink = test_sink();
        let (server, addr) = spawn_server(sink.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&Packet::outputs(0b01).encode())
            .await
            .unwrap();
        assert!(wait_for_states(&sink, &[true, false]).await);

        stream
            .write_all(&Packet::outputs(0b11).encode())
            .await
            .unwrap();
        assert!(wait_for_states(&sink, &[true, true]).await);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_unknown_object_id_keeps_connection_open() {
        let sink = test_sink();
        let (server, addr) = spawn_server(sink.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&Packet::outputs(0b10).encode())
            .await
            .unwrap();
        assert!(wait_for_states(&sink, &[false, true]).await);

        // Unknown object id: dispatched to nothing, state unchanged.
        let unknown = Packet {
            object_id: 99,
            field_a: 0b01,
            field_b: 0,
        };
        stream.write_all(&unknown.encode()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.states(), vec![false, true]);

        // The connection is still usable afterwards.
        stream
            .write_all(&Packet::outputs(0b01).encode())
            .await
            .unwrap();
        assert!(wait_for_states(&sink, &[true, false]).await);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_malformed_packet_skipped() {
        let sink = test_sink();
        let (server, addr) = spawn_server(sink.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();

        let mut corrupted = Packet::outputs(0b11).encode();
        corrupted[0] = 0x00;
        let mut bytes = corrupted.to_vec();
        bytes.extend_from_slice(&Packet::outputs(0b10).encode());
        stream.write_all(&bytes).await.unwrap();

        // The bad window is dropped, the following packet still applies.
        assert!(wait_for_states(&sink, &[false, true]).await);
        assert_eq!(server.stats().decode_errors_total.load(Ordering::Relaxed), 1);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_partial_writes_assemble() {
        let sink = test_sink();
        let (server, addr) = spawn_server(sink.clone()).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let encoded = Packet::outputs(0b11).encode();
        for byte in encoded {
            stream.write_all(&[byte]).await.unwrap();
            stream.flush().await.unwrap();
        }

        assert!(wait_for_states(&sink, &[true, true]).await);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_concurrent_connections() {
        let sink = test_sink();
        let (server, addr) = spawn_server(sink.clone()).await;

        let mut a = TcpStream::connect(addr).await.unwrap();
        let mut b = TcpStream::connect(addr).await.unwrap();

        a.write_all(&Packet::outputs(0b01).encode()).await.unwrap();
        b.write_all(&Packet::outputs(0b10).encode()).await.unwrap();

        // Last writer wins: the final state is one of the two patterns.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let states = sink.states();
        assert!(states == vec![true, false] || states == vec![false, true]);
        assert_eq!(server.stats().packets_total.load(Ordering::Relaxed), 2);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let sink = test_sink();
        let (server, addr) = spawn_server(sink).await;

        let _stream = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(server.is_running());

        server.shutdown();
        for _ in 0..100 {
            if !server.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!server.is_running());
    }
}
