//! # pinlink-server
//!
//! TCP server for pinlink.
//!
//! This crate provides:
//! - TCP connection handling with async I/O
//! - Stream framing and packet dispatch
//! - The output sink applying bit-patterns to pin state
//! - Layered YAML/env configuration
//! - An optional message-based WebSocket transport

pub mod config;
pub mod error;
pub mod handler;
pub mod outputs;
pub mod server;
pub mod session;
pub mod ws;

pub use config::{Config, ConfigError, NetworkConfig, OutputsConfig, WsConfig};
pub use error::ServerError;
pub use handler::PacketDispatcher;
pub use outputs::{Level, OutputSink, PinDriver, SimulatedGpio};
pub use server::{Server, ServerConfig, ServerStats};
pub use session::Session;
pub use ws::WsServer;
