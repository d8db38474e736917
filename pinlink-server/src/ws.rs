//! Message-based WebSocket transport.
//!
//! Each binary message must carry exactly one 15-byte packet, so there is no
//! stream framing here — message boundaries come from the transport.
//! Decoding and dispatch are otherwise identical to the TCP path, and both
//! transports share the same output sink.

use crate::error::ServerError;
use crate::handler::PacketDispatcher;
use crate::session::Session;
use futures_util::{SinkExt, StreamExt};
use pinlink_protocol::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

/// WebSocket listener for pinlink.
pub struct WsServer {
    bind_addr: SocketAddr,
    dispatcher: Arc<PacketDispatcher>,
    shutdown: broadcast::Sender<()>,
}

impl WsServer {
    /// Creates a WebSocket listener sharing the given dispatcher and
    /// shutdown channel.
    pub fn new(
        bind_addr: SocketAddr,
        dispatcher: Arc<PacketDispatcher>,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            bind_addr,
            dispatcher,
            shutdown,
        }
    }

    /// Binds the configured address and runs the accept loop.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: self.bind_addr,
                source: e,
            })?;
        self.run_on(listener).await
    }

    /// Runs the accept loop on an already-bound listener.
    pub async fn run_on(&self, listener: TcpListener) -> Result<(), ServerError> {
        tracing::info!("WebSocket listener on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let dispatcher = self.dispatcher.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    stream,
                                    addr,
                                    dispatcher,
                                    &mut conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!("[{}] WebSocket connection error: {}", addr, e);
                                }
                                tracing::info!("WebSocket client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("WebSocket accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("WebSocket listener shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Arc<PacketDispatcher>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| ServerError::WsHandshake(e.to_string()))?;

        let session = Session::new(addr);
        tracing::info!("WebSocket client connected: {} (session {})", addr, session.id);

        loop {
            tokio::select! {
                msg = ws.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            session.record_activity();
                            match Packet::decode(&data) {
                                Ok(packet) => {
                                    session.record_packet();
                                    dispatcher.dispatch(&session, &packet);
                                }
                                Err(e) => {
                                    session.record_decode_error();
                                    tracing::warn!("[{}] Dropping malformed message: {}", addr, e);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            ws.send(Message::Pong(payload))
                                .await
                                .map_err(|e| ServerError::Ws(e.to_string()))?;
                        }
                        Some(Ok(Message::Text(_))) => {
                            tracing::warn!("[{}] Ignoring text message", addr);
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::debug!("[{}] WebSocket closed by peer", addr);
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("[{}] WebSocket error: {}", addr, e);
                            return Err(ServerError::Ws(e.to_string()));
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    let _ = ws.close(None).await;
                    return Err(ServerError::ShuttingDown);
                }
            }
        }
    }
}
