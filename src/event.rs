//! Timestamped observations produced while the testbench runs.
//!
//! Edge events are produced by the synchronizer for output lines; line
//! transitions are recorded for every change of the bus lines.

use serde::{Deserialize, Serialize};

use crate::lines::{BusLines, Level, LineId};
use crate::types::{SimTime, Tick};

/// Direction of a transition on a single line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Low to high
    Rising,
    /// High to low
    Falling,
}

impl EdgeKind {
    /// The level the line must be at before this edge can happen.
    pub fn preceding_level(self) -> Level {
        match self {
            EdgeKind::Rising => Level::Low,
            EdgeKind::Falling => Level::High,
        }
    }

    /// The level the line reaches once the edge has happened.
    pub fn target_level(self) -> Level {
        match self {
            EdgeKind::Rising => Level::High,
            EdgeKind::Falling => Level::Low,
        }
    }
}

/// One observed transition on an output line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEvent {
    pub kind: EdgeKind,
    /// Line the edge was observed on (bus and bit position)
    pub line: LineId,
    /// Tick at which the new level was first observed
    pub tick: Tick,
    /// Simulated time of `tick`
    pub time: SimTime,
}

/// A change of the bus lines, recorded by the testbench.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTransition {
    pub tick: Tick,
    pub time: SimTime,
    pub before: BusLines,
    pub after: BusLines,
}

impl LineTransition {
    /// True if the bus clock went from low to high in this transition.
    pub fn is_clock_rise(&self) -> bool {
        self.before.clock.is_low() && self.after.clock.is_high()
    }

    /// True if select went from asserted to deasserted in this transition.
    pub fn is_deselect(&self) -> bool {
        self.before.is_selected() && !self.after.is_selected()
    }

    /// True if select went from deasserted to asserted in this transition.
    pub fn is_select(&self) -> bool {
        !self.before.is_selected() && self.after.is_selected()
    }
}
