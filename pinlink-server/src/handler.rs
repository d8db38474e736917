//! Packet dispatch.

use crate::outputs::OutputSink;
use crate::session::Session;
use pinlink_protocol::{Packet, OBJECT_OUTPUTS};
use std::sync::Arc;

/// Routes decoded packets to their target subsystem.
///
/// Shared by every connection handler (TCP and WebSocket); holds the
/// injected output sink rather than any global hardware handle.
pub struct PacketDispatcher {
    sink: Arc<OutputSink>,
}

impl PacketDispatcher {
    /// Creates a dispatcher over the given output sink.
    pub fn new(sink: Arc<OutputSink>) -> Self {
        Self { sink }
    }

    /// Applies one decoded packet.
    ///
    /// Unknown object ids are logged and ignored so that newer controllers
    /// can address subsystems this server does not have.
    pub fn dispatch(&self, session: &Session, packet: &Packet) {
        tracing::debug!(
            "[{}] Packet: object_id={} field_a={:#06b} field_b={}",
            session.remote_addr,
            packet.object_id,
            packet.field_a,
            packet.field_b
        );

        match packet.object_id {
            OBJECT_OUTPUTS => {
                let states = self.sink.apply(packet.field_a);
                tracing::info!("[{}] Outputs set to {:?}", session.remote_addr, states);
            }
            other => {
                tracing::warn!(
                    "[{}] Ignoring packet for unknown object id {}",
                    session.remote_addr,
                    other
                );
            }
        }
    }

    /// The sink this dispatcher applies output commands to.
    pub fn sink(&self) -> &Arc<OutputSink> {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::SimulatedGpio;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    fn dispatcher() -> PacketDispatcher {
        let sink = Arc::new(OutputSink::new(vec![5, 6], Box::new(SimulatedGpio::new())));
        PacketDispatcher::new(sink)
    }

    fn session() -> Session {
        Session::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000))
    }

    #[test]
    fn test_dispatch_output_patterns() {
        let dispatcher = dispatcher();
        let session = session();

        dispatcher.dispatch(&session, &Packet::outputs(0b01));
        assert_eq!(dispatcher.sink().states(), vec![true, false]);

        dispatcher.dispatch(&session, &Packet::outputs(0b10));
        assert_eq!(dispatcher.sink().states(), vec![false, true]);

        dispatcher.dispatch(&session, &Packet::outputs(0b11));
        assert_eq!(dispatcher.sink().states(), vec![true, true]);

        dispatcher.dispatch(&session, &Packet::outputs(0b00));
        assert_eq!(dispatcher.sink().states(), vec![false, false]);
    }

    #[test]
    fn test_unknown_object_id_ignored() {
        let dispatcher = dispatcher();
        let session = session();

        dispatcher.dispatch(&session, &Packet::outputs(0b11));
        dispatcher.dispatch(
            &session,
            &Packet {
                object_id: 99,
                field_a: 0b00,
                field_b: 0,
            },
        );

        // State from the last known-object packet is untouched.
        assert_eq!(dispatcher.sink().states(), vec![true, true]);
    }
}
