//! The output sink: applies decoded bit-patterns to pin states.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Logic level of an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Seam between the sink and the underlying pin hardware.
///
/// Implementations must tolerate concurrent calls; the sink serializes
/// whole patterns but nothing stops several sinks sharing one driver.
pub trait PinDriver: Send + Sync {
    /// Drives one pin to the given level.
    fn write(&self, pin: u8, level: Level);
}

/// Pin driver that records levels instead of touching hardware.
pub struct SimulatedGpio {
    levels: Mutex<HashMap<u8, Level>>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self {
            levels: Mutex::new(HashMap::new()),
        }
    }

    /// Last level written to a pin, if any.
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.levels.lock().get(&pin).copied()
    }
}

impl Default for SimulatedGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl PinDriver for SimulatedGpio {
    fn write(&self, pin: u8, level: Level) {
        self.levels.lock().insert(pin, level);
        tracing::debug!("Pin {} set to {:?}", pin, level);
    }
}

/// Applies command bit-patterns to a fixed table of output pins.
///
/// The sink is the only state shared between connection handlers. It
/// serializes its own mutation, so concurrent `apply` calls land one whole
/// pattern at a time: the final state is always one of the submitted
/// patterns (last writer wins), never a mix.
pub struct OutputSink {
    pins: Vec<u8>,
    states: Mutex<Vec<bool>>,
    driver: Box<dyn PinDriver>,
}

impl OutputSink {
    /// Creates a sink over the given pin table with every output driven low.
    pub fn new(pins: Vec<u8>, driver: Box<dyn PinDriver>) -> Self {
        for &pin in &pins {
            driver.write(pin, Level::Low);
        }
        let states = vec![false; pins.len()];
        Self {
            pins,
            states: Mutex::new(states),
            driver,
        }
    }

    /// Number of configured outputs.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Applies a bit-pattern: bit `i` (LSB first) drives output `i`.
    /// Bits beyond the pin table are ignored.
    ///
    /// Returns the post-apply state of every output.
    pub fn apply(&self, pattern: u32) -> Vec<bool> {
        let mut states = self.states.lock();
        for (i, (&pin, state)) in self.pins.iter().zip(states.iter_mut()).enumerate() {
            let on = pattern & (1 << i) != 0;
            self.driver.write(pin, if on { Level::High } else { Level::Low });
            *state = on;
        }
        states.clone()
    }

    /// Current state of every output.
    pub fn states(&self) -> Vec<bool> {
        self.states.lock().clone()
    }
}
