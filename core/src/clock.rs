//! Server clock: owns the tick counter and pause state.

use crate::types::Tick;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerClock {
    pub current_tick: Tick,
    pub paused:       bool,
}

impl ServerClock {
    pub fn new() -> Self {
        Self {
            current_tick: 0,
            paused: false,
        }
    }

    /// Advance one tick. Returns the new tick number, or `None` while paused.
    pub fn advance(&mut self) -> Option<Tick> {
        if self.paused {
            return None;
        }
        self.current_tick += 1;
        Some(self.current_tick)
    }

    pub fn pause(&mut self) { self.paused = true; }
}

impl Default for ServerClock {
    fn default() -> Self { Self::new() }
}
