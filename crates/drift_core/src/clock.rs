//! Session clock
//!
//! Time is owned by the running simulation, not the process. Components read
//! the clock through the context they are handed each tick, which keeps the
//! whole subsystem deterministic under test.

use serde::{Deserialize, Serialize};

/// Monotonic session clock advanced once per simulation tick
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SimClock {
    /// Seconds since session start
    elapsed: f64,
    /// Ticks since session start
    ticks: u64,
}

impl SimClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick of `delta_time` seconds
    pub fn advance(&mut self, delta_time: f32) {
        self.elapsed += delta_time as f64;
        self.ticks += 1;
    }

    /// Seconds since session start
    pub fn now(&self) -> f64 {
        self.elapsed
    }

    /// Ticks since session start
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance() {
        let mut clock = SimClock::new();
        assert_eq!(clock.now(), 0.0);

        clock.advance(0.5);
        clock.advance(0.25);
        assert!((clock.now() - 0.75).abs() < 1e-9);
        assert_eq!(clock.tick_count(), 2);
    }
}
