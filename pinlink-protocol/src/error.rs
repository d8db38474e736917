//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur while decoding packets.
///
/// Both variants are per-packet: the connection that produced them stays
/// open and the offending bytes are skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid packet length: {actual} bytes (expected {expected})")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid packet markers: start {start:02X?}, end {end:#04X}")]
    InvalidMarkers { start: [u8; 2], end: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 15,
            actual: 7,
        };
        assert!(err.to_string().contains("7"));
        assert!(err.to_string().contains("15"));

        let err = ProtocolError::InvalidMarkers {
            start: [0xAA, 0xBB],
            end: 0xCC,
        };
        let msg = err.to_string();
        assert!(msg.contains("AA"));
        assert!(msg.contains("0xCC"));
    }
}
