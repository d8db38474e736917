//! The fixed-size binary command packet.
//!
//! Wire layout (little-endian, exactly 15 bytes):
//!
//! ```text
//! +--------------+-----------+----------+----------+------------+
//! | start marker | object_id | field_a  | field_b  | end marker |
//! |   2 bytes    |  4 bytes  | 4 bytes  | 4 bytes  |   1 byte   |
//! |   FD FE      |  u32 LE   | u32 LE   | u32 LE   |     FF     |
//! +--------------+-----------+----------+----------+------------+
//! ```

use crate::error::ProtocolError;

/// Start-of-packet marker bytes.
pub const START_MARKER: [u8; 2] = [0xFD, 0xFE];

/// End-of-packet marker byte.
pub const END_MARKER: u8 = 0xFF;

/// Total wire size of a packet in bytes.
pub const PACKET_SIZE: usize = 15;

/// A decoded command packet.
///
/// A packet is either fully valid (both markers matched) or discarded; there
/// is no partially-valid state. `object_id` is not validated here — unknown
/// ids are a dispatch-time concern, not a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Target subsystem (1 = output controller, other values reserved).
    pub object_id: u32,
    /// Primary payload; for the output controller, a bit-pattern selecting
    /// which outputs are on (LSB first).
    pub field_a: u32,
    /// Secondary payload, reserved. Send 0.
    pub field_b: u32,
}

impl Packet {
    /// Creates a packet addressed at the output controller.
    pub fn outputs(pattern: u32) -> Self {
        Self {
            object_id: crate::OBJECT_OUTPUTS,
            field_a: pattern,
            field_b: 0,
        }
    }

    /// Encodes the packet into its 15-byte wire form.
    ///
    /// Serialization is deterministic and infallible: the `u32` field types
    /// already bound every value to the wire range.
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0..2].copy_from_slice(&START_MARKER);
        buf[2..6].copy_from_slice(&self.object_id.to_le_bytes());
        buf[6..10].copy_from_slice(&self.field_a.to_le_bytes());
        buf[10..14].copy_from_slice(&self.field_b.to_le_bytes());
        buf[14] = END_MARKER;
        buf
    }

    /// Decodes a packet from exactly [`PACKET_SIZE`] bytes.
    ///
    /// Fails with [`ProtocolError::InvalidLength`] for any other input
    /// length, and with [`ProtocolError::InvalidMarkers`] if the start or
    /// end marker does not match. Field values are not validated further.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != PACKET_SIZE {
            return Err(ProtocolError::InvalidLength {
                expected: PACKET_SIZE,
                actual: bytes.len(),
            });
        }

        let start = [bytes[0], bytes[1]];
        let end = bytes[PACKET_SIZE - 1];
        if start != START_MARKER || end != END_MARKER {
            return Err(ProtocolError::InvalidMarkers { start, end });
        }

        Ok(Self {
            object_id: u32::from_le_bytes(bytes[2..6].try_into().unwrap()),
            field_a: u32::from_le_bytes(bytes[6..10].try_into().unwrap()),
            field_b: u32::from_le_bytes(bytes[10..14].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_packet_roundtrip() {
        let packet = Packet {
            object_id: 1,
            field_a: 0b11,
            field_b: 0,
        };

        let encoded = packet.encode();
        let decoded = Packet::decode(&encoded).unwrap();

        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_known_wire_bytes() {
        // object_id=1, field_a=3, field_b=0
        let packet = Packet::outputs(0b11);
        let encoded = packet.encode();

        assert_eq!(
            encoded,
            [
                0xFD, 0xFE, // start marker
                0x01, 0x00, 0x00, 0x00, // object_id = 1, LE
                0x03, 0x00, 0x00, 0x00, // field_a = 3, LE
                0x00, 0x00, 0x00, 0x00, // field_b = 0, LE
                0xFF, // end marker
            ]
        );
    }

    #[test]
    fn test_invalid_length() {
        let result = Packet::decode(&[0xFD, 0xFE, 0x01]);
        assert_eq!(
            result,
            Err(ProtocolError::InvalidLength {
                expected: PACKET_SIZE,
                actual: 3,
            })
        );

        let result = Packet::decode(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidLength { actual: 16, .. })
        ));
    }

    #[test]
    fn test_invalid_start_marker() {
        let mut bytes = Packet::outputs(1).encode();
        bytes[0] = 0xAB;

        let result = Packet::decode(&bytes);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidMarkers {
                start: [0xAB, 0xFE],
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_end_marker() {
        let mut bytes = Packet::outputs(1).encode();
        bytes[14] = 0x00;

        let result = Packet::decode(&bytes);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidMarkers { end: 0x00, .. })
        ));
    }

    #[test]
    fn test_outputs_constructor() {
        let packet = Packet::outputs(0b10);
        assert_eq!(packet.object_id, crate::OBJECT_OUTPUTS);
        assert_eq!(packet.field_a, 0b10);
        assert_eq!(packet.field_b, 0);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(object_id: u32, field_a: u32, field_b: u32) {
            let packet = Packet { object_id, field_a, field_b };
            let decoded = Packet::decode(&packet.encode()).unwrap();
            prop_assert_eq!(decoded, packet);
        }

        #[test]
        fn prop_bad_markers_rejected(
            start in prop::array::uniform2(any::<u8>()),
            end: u8,
            object_id: u32,
            field_a: u32,
            field_b: u32,
        ) {
            prop_assume!(start != START_MARKER || end != END_MARKER);

            let mut bytes = Packet { object_id, field_a, field_b }.encode();
            bytes[0..2].copy_from_slice(&start);
            bytes[14] = end;

            prop_assert_eq!(
                Packet::decode(&bytes),
                Err(ProtocolError::InvalidMarkers { start, end })
            );
        }
    }
}
