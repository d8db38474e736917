//! pinlink - device-control link server
//!
//! A TCP server that decodes fixed-size binary command packets and drives a
//! set of addressable outputs.

use pinlink_server::{Config, OutputSink, Server, ServerConfig, SimulatedGpio, WsServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if PINLINK_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("PINLINK_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("PINLINK_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            Config::default()
        }
    };

    tracing::info!("Starting pinlink server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Output pins: {:?}", config.outputs.pins);
    if config.ws.enabled {
        tracing::info!("  WebSocket: enabled on {}", config.ws.bind_addr);
    } else {
        tracing::info!("  WebSocket: disabled");
    }

    // The sink is the single owner of pin state; both transports share it.
    let sink = Arc::new(OutputSink::new(
        config.outputs.pins.clone(),
        Box::new(SimulatedGpio::new()),
    ));

    let mut server_config = ServerConfig::new(config.network.bind_addr);
    server_config.read_timeout = config.network.read_timeout();
    server_config.max_connections = config.network.max_connections;
    let server = Arc::new(Server::new(server_config, sink));

    // Start the WebSocket transport when enabled
    let ws_handle = if config.ws.enabled {
        let ws_server = WsServer::new(
            config.ws.bind_addr,
            server.dispatcher().clone(),
            server.shutdown_sender(),
        );
        Some(tokio::spawn(async move { ws_server.run().await }))
    } else {
        None
    };

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    // Wait for the WebSocket listener to stop
    if let Some(handle) = ws_handle {
        match handle.await {
            Ok(Err(e)) => tracing::error!("WebSocket listener error: {}", e),
            Err(e) => tracing::error!("WebSocket task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
