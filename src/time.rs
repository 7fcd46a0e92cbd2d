// PixelDeck
// copyright zipxing@hotmail.com 2022～2025

//! Time units.
//!
//! `WallTime` is a point on the monotonic wall clock in microseconds. Events carry
//! one, and cards ask for timers with one. `Ticks` is the scheduler's virtual clock,
//! one tick per 1/60 second.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// microseconds per tick
pub const TICK_USECS: i64 = 16_667;

/// smallest step the scheduler takes when firing a timer
pub const MINOR_TICK: Ticks = Ticks(1);

#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Ticks(pub i64);

#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct WallTime(pub i64);

impl Ticks {
    pub fn to_wall(self) -> WallTime {
        WallTime(self.0 * TICK_USECS)
    }

    pub fn count(self) -> i64 {
        self.0
    }
}

impl WallTime {
    pub fn from_usecs(usecs: i64) -> Self {
        WallTime(usecs)
    }

    pub fn usecs(self) -> i64 {
        self.0
    }

    /// Tick containing this instant. Used for events.
    pub fn floor_ticks(self) -> Ticks {
        Ticks(self.0.div_euclid(TICK_USECS))
    }

    /// First tick at or after this instant. Used for timers, so they never fire early.
    pub fn ceil_ticks(self) -> Ticks {
        let t = self.0.div_euclid(TICK_USECS);
        if self.0.rem_euclid(TICK_USECS) == 0 {
            Ticks(t)
        } else {
            Ticks(t + 1)
        }
    }
}

impl Add for Ticks {
    type Output = Ticks;
    fn add(self, rhs: Ticks) -> Ticks {
        Ticks(self.0 + rhs.0)
    }
}

impl Sub for Ticks {
    type Output = Ticks;
    fn sub(self, rhs: Ticks) -> Ticks {
        Ticks(self.0 - rhs.0)
    }
}

impl Add<Ticks> for WallTime {
    type Output = WallTime;
    fn add(self, rhs: Ticks) -> WallTime {
        WallTime(self.0 + rhs.0 * TICK_USECS)
    }
}

impl Add<Duration> for WallTime {
    type Output = WallTime;
    fn add(self, rhs: Duration) -> WallTime {
        WallTime(self.0 + rhs.as_micros() as i64)
    }
}

impl Sub for WallTime {
    type Output = Duration;
    /// Saturates at zero.
    fn sub(self, rhs: WallTime) -> Duration {
        Duration::from_micros((self.0 - rhs.0).max(0) as u64)
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
