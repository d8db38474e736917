//! # pinlink-protocol
//!
//! Wire protocol implementation for pinlink.
//!
//! This crate provides:
//! - The fixed 15-byte binary command packet
//! - Packet encoding/decoding with marker validation
//! - A frame assembler turning an arbitrarily chunked byte stream into packets

pub mod assembler;
pub mod error;
pub mod packet;

pub use assembler::FrameAssembler;
pub use error::ProtocolError;
pub use packet::{Packet, END_MARKER, PACKET_SIZE, START_MARKER};

/// Object id addressing the output (LED) controller.
pub const OBJECT_OUTPUTS: u32 = 1;

/// Default port for the pinlink server.
pub const DEFAULT_PORT: u16 = 50002;
