//! Stream framing: turning chunked reads into discrete packets.

use crate::error::ProtocolError;
use crate::packet::{Packet, PACKET_SIZE};
use bytes::{Buf, BytesMut};

/// Assembles fixed-size packets out of an arbitrarily chunked byte stream.
///
/// Bytes are buffered across reads and consumed front-to-back, so packets
/// come out in arrival order. Framing is by fixed size only: when the
/// markers of a 15-byte window do not match, those bytes are discarded
/// anyway and the error reported upstream. There is no resynchronization by
/// scanning for the next start marker — a corrupted stream stays
/// desynchronized until the connection is re-established.
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * PACKET_SIZE),
        }
    }

    /// Appends received bytes to the internal buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to extract the next packet from the buffer.
    ///
    /// Returns `Ok(None)` when fewer than [`PACKET_SIZE`] bytes are buffered
    /// (wait for more data). Otherwise consumes exactly [`PACKET_SIZE`]
    /// bytes, returning the decoded packet or
    /// [`ProtocolError::InvalidMarkers`] if they did not frame one.
    pub fn try_extract(&mut self) -> Result<Option<Packet>, ProtocolError> {
        if self.buffer.len() < PACKET_SIZE {
            return Ok(None);
        }

        let result = Packet::decode(&self.buffer[..PACKET_SIZE]);
        self.buffer.advance(PACKET_SIZE);
        result.map(Some)
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
