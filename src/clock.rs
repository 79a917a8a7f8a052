//! The simulated clock source.
//!
//! `SimClock` is the single source of time for a testbench. It produces a
//! strictly increasing sequence of ticks at a fixed nominal period, and every
//! timestamp in the crate is derived from it.
//!
//! # Example
//!
//! ```
//! use buswave::clock::{SimClock, TimeUnit};
//!
//! // 100 ns period, i.e. a 10 MHz clock
//! let mut clock = SimClock::new(100, TimeUnit::Ns);
//! clock.advance();
//! clock.advance();
//! assert_eq!(clock.tick(), 2);
//! assert_eq!(clock.now(), 200);
//! assert_eq!(clock.frequency_hz(), 10_000_000.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{SimTime, Tick, TickCount};

/// Base unit of [`SimTime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Picoseconds
    Ps,
    /// Nanoseconds
    #[default]
    Ns,
    /// Microseconds
    Us,
    /// Milliseconds
    Ms,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn as_secs_f64(self) -> f64 {
        match self {
            TimeUnit::Ps => 1e-12,
            TimeUnit::Ns => 1e-9,
            TimeUnit::Us => 1e-6,
            TimeUnit::Ms => 1e-3,
        }
    }

    /// Converts a duration in this unit to seconds.
    pub fn to_secs(self, duration: SimTime) -> f64 {
        duration as f64 * self.as_secs_f64()
    }
}

/// A monotonically increasing tick source with a fixed period.
#[derive(Clone, Debug)]
pub struct SimClock {
    /// Length of one tick in `unit`
    period: SimTime,
    /// Base unit of the period and of all derived timestamps
    unit: TimeUnit,
    /// Ticks elapsed since creation
    tick: Tick,
}

impl SimClock {
    /// Creates a clock at tick 0.
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn new(period: SimTime, unit: TimeUnit) -> Self {
        assert!(period > 0, "clock period must be positive");
        Self {
            period,
            unit,
            tick: 0,
        }
    }

    /// Advances by one tick and returns the new tick index.
    pub fn advance(&mut self) -> Tick {
        self.tick += 1;
        self.tick
    }

    /// Current tick index.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.time_of(self.tick)
    }

    /// Simulated time of an arbitrary tick.
    pub fn time_of(&self, tick: Tick) -> SimTime {
        tick * self.period
    }

    /// Duration spanned by `ticks` ticks.
    pub fn duration_of(&self, ticks: TickCount) -> SimTime {
        ticks * self.period
    }

    /// Tick period in base units.
    pub fn period(&self) -> SimTime {
        self.period
    }

    /// Base time unit.
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Nominal clock frequency in Hz.
    pub fn frequency_hz(&self) -> f64 {
        1.0 / self.unit.to_secs(self.period)
    }
}
