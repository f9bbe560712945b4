#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-tick timing context.
///
/// `now_seconds` is the monotonic simulation clock; memory TTLs and any other
/// absolute timestamps are measured against it, never against per-state
/// timers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TickContext {
    pub tick: u64,
    pub dt_seconds: f32,
    pub now_seconds: f32,
}

impl TickContext {
    pub fn first(dt_seconds: f32) -> Self {
        debug_assert!(dt_seconds > 0.0, "dt must be positive");
        Self {
            tick: 0,
            dt_seconds,
            now_seconds: 0.0,
        }
    }

    /// Context for the next tick, `dt` seconds later.
    pub fn advanced(self, dt_seconds: f32) -> Self {
        debug_assert!(dt_seconds > 0.0, "dt must be positive");
        Self {
            tick: self.tick + 1,
            dt_seconds,
            now_seconds: self.now_seconds + dt_seconds,
        }
    }
}
