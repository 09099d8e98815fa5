//! Tick durations.
//!
//! A [`TickDelta`] stores the elapsed step duration as exact fixed-point
//! milliseconds. Millisecond timers (switch phases, charge, bomb states)
//! advance by [`TickDelta::millis`] so that authored thresholds such as a
//! 300 ms stow are hit exactly; second-based countdowns (cooldowns,
//! reaction timers, projectile lifetimes) use [`TickDelta::secs`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// Elapsed simulation time for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TickDelta {
    #[serde(with = "fixed_serde")]
    millis: Fixed,
}

impl TickDelta {
    /// A zero-length tick.
    pub const ZERO: Self = Self { millis: Fixed::ZERO };

    /// Tick of `ms` whole milliseconds.
    #[must_use]
    pub fn from_millis(ms: u32) -> Self {
        Self {
            millis: Fixed::from_num(ms),
        }
    }

    /// Tick of `secs` seconds. Negative durations clamp to zero.
    #[must_use]
    pub fn from_secs(secs: Fixed) -> Self {
        Self {
            millis: (secs * Fixed::from_num(1000)).max(Fixed::ZERO),
        }
    }

    /// Duration in milliseconds.
    #[must_use]
    pub const fn millis(self) -> Fixed {
        self.millis
    }

    /// Duration in seconds.
    #[must_use]
    pub fn secs(self) -> Fixed {
        self.millis / Fixed::from_num(1000)
    }

    /// Cap the duration at `max`.
    #[must_use]
    pub fn capped(self, max: Self) -> Self {
        self.min(max)
    }
}

/// Decrement a countdown, flooring at zero.
#[must_use]
pub fn count_down(remaining: Fixed, by: Fixed) -> Fixed {
    (remaining - by).max(Fixed::ZERO)
}
