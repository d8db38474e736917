//! Per-connection session bookkeeping.

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Connection-scoped identity and counters.
///
/// Used for logging and diagnostics only; owned exclusively by the
/// connection's handler task, which is the only writer.
pub struct Session {
    /// Unique session id.
    pub id: String,

    /// Remote peer address.
    pub remote_addr: SocketAddr,

    /// Packets dispatched on this connection.
    packets: AtomicU64,

    /// Malformed packets skipped on this connection.
    decode_errors: AtomicU64,

    /// Session creation time.
    created_at: Instant,

    /// Last receive time.
    last_activity: Mutex<Instant>,
}

impl Session {
    /// Creates a new session for an accepted connection.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            packets: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            created_at: Instant::now(),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Records received data.
    pub fn record_activity(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Records a dispatched packet.
    pub fn record_packet(&self) {
        self.packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a skipped malformed packet.
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Packets dispatched so far.
    pub fn packet_count(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    /// Malformed packets skipped so far.
    pub fn decode_error_count(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    /// Time since the last receive.
    pub fn idle_duration(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Session age.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
