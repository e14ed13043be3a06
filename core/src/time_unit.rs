//! Conversion between wall-clock units and server ticks.
//!
//! One tick is 1/20 of a second. Every conversion truncates toward zero;
//! converting a duration that is not a multiple of 50 ms into ticks silently
//! drops the remainder. Conversions that would overflow saturate.

use crate::types::TICKS_PER_SECOND;
use serde::{Deserialize, Serialize};

const MILLIS_PER_TICK: u64 = 1000 / TICKS_PER_SECOND;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Ticks,
}

impl TimeUnit {
    fn millis_per_unit(self) -> u64 {
        match self {
            Self::Days         => 86_400_000,
            Self::Hours        => 3_600_000,
            Self::Minutes      => 60_000,
            Self::Seconds      => 1_000,
            Self::Milliseconds => 1,
            Self::Ticks        => MILLIS_PER_TICK,
        }
    }

    /// Convert `duration` expressed in `self` into `target` units.
    pub fn convert(self, duration: u64, target: TimeUnit) -> u64 {
        let from = self.millis_per_unit();
        let to = target.millis_per_unit();
        // Every unit's millisecond length divides the next coarser one.
        if from >= to {
            duration.saturating_mul(from / to)
        } else {
            duration / (to / from)
        }
    }

    pub fn to_days(self, duration: u64) -> u64 { self.convert(duration, Self::Days) }
    pub fn to_hours(self, duration: u64) -> u64 { self.convert(duration, Self::Hours) }
    pub fn to_minutes(self, duration: u64) -> u64 { self.convert(duration, Self::Minutes) }
    pub fn to_seconds(self, duration: u64) -> u64 { self.convert(duration, Self::Seconds) }
    pub fn to_millis(self, duration: u64) -> u64 { self.convert(duration, Self::Milliseconds) }
    pub fn to_ticks(self, duration: u64) -> u64 { self.convert(duration, Self::Ticks) }

    /// Wall-clock length of `duration` in this unit.
    pub fn to_duration(self, duration: u64) -> chrono::Duration {
        let millis = i64::try_from(self.to_millis(duration)).unwrap_or(i64::MAX);
        chrono::Duration::milliseconds(millis)
    }

    /// How many whole units of `self` fit in `duration`. Negative durations count as zero.
    pub fn count_in(self, duration: chrono::Duration) -> u64 {
        let millis = u64::try_from(duration.num_milliseconds()).unwrap_or(0);
        Self::Milliseconds.convert(millis, self)
    }
}
