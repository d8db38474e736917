//! # pinlink-client
//!
//! Client library for pinlink.
//!
//! This crate provides:
//! - An async TCP session with single-attempt connect and liveness probing
//! - A high-level API for driving output patterns
//! - Bounded, sequential reconnect-with-retry for failed sends

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig, RetryPolicy};
pub use error::ClientError;
