//! Edge synchronization on output lines.
//!
//! All waits poll the line once per tick and are bounded by a tick budget.
//! Running out of budget yields [`EdgeWait::TimedOut`]; it is an expected
//! outcome (a line held at 0 % or 100 % duty never toggles) and never an
//! error.
//!
//! An edge is never inferred from the current level alone: to catch a rising
//! edge the line is first seen low, then high. A line that is already high
//! when the wait starts therefore does not count as freshly risen.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::bench::Testbench;
use crate::device::Device;
use crate::event::{EdgeEvent, EdgeKind};
use crate::lines::{Level, LineId};
use crate::task::{BenchTask, TaskPoll, TickContext};
use crate::types::{SimTime, Tick, TickCount};

/// Outcome of a bounded wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeWait<T> {
    Observed(T),
    TimedOut,
}

impl<T> EdgeWait<T> {
    pub fn is_observed(&self) -> bool {
        matches!(self, EdgeWait::Observed(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, EdgeWait::TimedOut)
    }

    pub fn observed(self) -> Option<T> {
        match self {
            EdgeWait::Observed(value) => Some(value),
            EdgeWait::TimedOut => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> EdgeWait<U> {
        match self {
            EdgeWait::Observed(value) => EdgeWait::Observed(f(value)),
            EdgeWait::TimedOut => EdgeWait::TimedOut,
        }
    }
}

impl<T> Default for EdgeWait<T> {
    fn default() -> Self {
        EdgeWait::TimedOut
    }
}

/// Waits for one line to reach a level.
///
/// Checks the line at the current instant, then after each of up to
/// `budget` ticks. Completes with the tick and time at which the level was
/// first seen.
#[derive(Clone, Debug)]
pub struct LevelWait {
    line: LineId,
    level: Level,
    remaining: TickCount,
}

impl LevelWait {
    pub fn new(line: LineId, level: Level, budget: TickCount) -> Self {
        Self {
            line,
            level,
            remaining: budget,
        }
    }
}

impl BenchTask for LevelWait {
    type Output = EdgeWait<(Tick, SimTime)>;

    fn name(&self) -> &str {
        "level_wait"
    }

    fn poll(&mut self, ctx: &mut TickContext) -> TaskPoll<Self::Output> {
        if ctx.level(self.line) == self.level {
            return TaskPoll::Ready(EdgeWait::Observed((ctx.tick(), ctx.now())));
        }
        if self.remaining == 0 {
            return TaskPoll::Ready(EdgeWait::TimedOut);
        }
        self.remaining -= 1;
        TaskPoll::Pending
    }
}

/// Timestamps collected by [`Testbench::await_full_cycle`].
///
/// Steps after the first timeout are left as `TimedOut`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTimestamps {
    /// Line first seen low
    pub sync: EdgeWait<SimTime>,
    pub rising1: EdgeWait<EdgeEvent>,
    pub falling1: EdgeWait<EdgeEvent>,
    pub rising2: EdgeWait<EdgeEvent>,
}

impl CycleTimestamps {
    /// True if every step was observed.
    pub fn is_complete(&self) -> bool {
        self.sync.is_observed()
            && self.rising1.is_observed()
            && self.falling1.is_observed()
            && self.rising2.is_observed()
    }
}

impl<D: Device> Testbench<D> {
    /// Waits up to `timeout_ticks` for `line` to be at `level`.
    pub fn await_level(
        &mut self,
        line: LineId,
        level: Level,
        timeout_ticks: TickCount,
    ) -> EdgeWait<SimTime> {
        let started = self.tick();
        match self.await_level_at(line, level, timeout_ticks) {
            EdgeWait::Observed((_, time)) => EdgeWait::Observed(time),
            EdgeWait::TimedOut => {
                warn!(%line, %level, started, timeout_ticks, "level wait timed out");
                EdgeWait::TimedOut
            }
        }
    }

    fn await_level_at(
        &mut self,
        line: LineId,
        level: Level,
        timeout_ticks: TickCount,
    ) -> EdgeWait<(Tick, SimTime)> {
        let result = self.run_task(LevelWait::new(line, level, timeout_ticks));
        if result.is_timed_out() {
            self.stats.wait_timeouts += 1;
        }
        result
    }

    /// Waits for an edge of `kind` on `line`.
    ///
    /// First waits for the level preceding the edge, then for the target
    /// level; each wait has its own `timeout_ticks` budget.
    pub fn await_edge(
        &mut self,
        line: LineId,
        kind: EdgeKind,
        timeout_ticks: TickCount,
    ) -> EdgeWait<EdgeEvent> {
        if self
            .await_level(line, kind.preceding_level(), timeout_ticks)
            .is_timed_out()
        {
            return EdgeWait::TimedOut;
        }
        self.await_transition(line, kind, timeout_ticks)
    }

    /// Waits for the target level of `kind`, assuming the preceding level
    /// has just been seen.
    fn await_transition(
        &mut self,
        line: LineId,
        kind: EdgeKind,
        timeout_ticks: TickCount,
    ) -> EdgeWait<EdgeEvent> {
        let started = self.tick();
        match self.await_level_at(line, kind.target_level(), timeout_ticks) {
            EdgeWait::Observed((tick, time)) => {
                trace!(%line, ?kind, tick, "edge observed");
                EdgeWait::Observed(EdgeEvent {
                    kind,
                    line,
                    tick,
                    time,
                })
            }
            EdgeWait::TimedOut => {
                warn!(%line, ?kind, started, timeout_ticks, "edge wait timed out");
                EdgeWait::TimedOut
            }
        }
    }

    /// Captures one full cycle: low, rising edge, falling edge, rising edge.
    ///
    /// Each step has its own `timeout_ticks` budget. The first step to time
    /// out leaves it and every later step `TimedOut`.
    pub fn await_full_cycle(&mut self, line: LineId, timeout_ticks: TickCount) -> CycleTimestamps {
        let mut cycle = CycleTimestamps::default();

        cycle.sync = self.await_level(line, Level::Low, timeout_ticks);
        if cycle.sync.is_timed_out() {
            return cycle;
        }
        cycle.rising1 = self.await_transition(line, EdgeKind::Rising, timeout_ticks);
        if cycle.rising1.is_timed_out() {
            return cycle;
        }
        cycle.falling1 = self.await_transition(line, EdgeKind::Falling, timeout_ticks);
        if cycle.falling1.is_timed_out() {
            return cycle;
        }
        cycle.rising2 = self.await_transition(line, EdgeKind::Rising, timeout_ticks);
        cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;
    use crate::device::WaveformDevice;
    use crate::lines::OutputBus;

    fn line() -> LineId {
        LineId::new(OutputBus::InOut, 2)
    }

    fn bench(device: WaveformDevice) -> Testbench<WaveformDevice> {
        Testbench::new(BenchConfig::default(), device)
    }

    #[test]
    fn test_edge_wait_helpers() {
        let wait: EdgeWait<u64> = EdgeWait::Observed(7);
        assert!(wait.is_observed());
        assert_eq!(wait.map(|t| t * 2).observed(), Some(14));
        let wait: EdgeWait<u64> = EdgeWait::default();
        assert!(wait.is_timed_out());
        assert_eq!(wait.observed(), None);
    }

    #[test]
    fn test_level_already_present_returns_immediately() {
        let mut bench = bench(WaveformDevice::constant(line(), Level::Low));
        assert_eq!(bench.await_level(line(), Level::Low, 0), EdgeWait::Observed(0));
        assert_eq!(bench.tick(), 0);
    }

    #[test]
    fn test_level_timeout_consumes_budget() {
        let mut bench = bench(WaveformDevice::constant(line(), Level::Low));
        assert!(bench.await_level(line(), Level::High, 25).is_timed_out());
        assert_eq!(bench.tick(), 25);
        assert_eq!(bench.stats().wait_timeouts, 1);
    }

    #[test]
    fn test_rising_edge_not_inferred_from_high_line() {
        // High for 10 ticks, low for 5, then high again
        let dev = WaveformDevice::once(
            line(),
            vec![(Level::High, 10), (Level::Low, 5), (Level::High, 1)],
        );
        let mut bench = bench(dev);
        let edge = bench.await_edge(line(), EdgeKind::Rising, 100).observed().unwrap();
        assert_eq!(edge.kind, EdgeKind::Rising);
        assert_eq!(edge.tick, 15);
        assert_eq!(edge.time, 1_500);
    }

    #[test]
    fn test_falling_edge() {
        let dev = WaveformDevice::square(line(), 20, 5);
        let mut bench = bench(dev);
        let edge = bench.await_edge(line(), EdgeKind::Falling, 100).observed().unwrap();
        assert_eq!(edge.tick, 5);
        assert_eq!(edge.kind, EdgeKind::Falling);
    }

    #[test]
    fn test_full_cycle_on_square_wave() {
        // Starts high: sync at 3, rises at 10, falls at 13, rises at 20
        let mut bench = bench(WaveformDevice::square(line(), 10, 3));
        let cycle = bench.await_full_cycle(line(), 50);
        assert!(cycle.is_complete());
        assert_eq!(cycle.sync, EdgeWait::Observed(300));
        let r1 = cycle.rising1.observed().unwrap();
        let f1 = cycle.falling1.observed().unwrap();
        let r2 = cycle.rising2.observed().unwrap();
        assert_eq!((r1.tick, f1.tick, r2.tick), (10, 13, 20));
        assert!(r1.time < f1.time && f1.time < r2.time);
    }

    #[test]
    fn test_full_cycle_short_circuits() {
        let mut bench = bench(WaveformDevice::constant(line(), Level::Low));
        let cycle = bench.await_full_cycle(line(), 1_000);
        assert!(cycle.sync.is_observed());
        assert!(cycle.rising1.is_timed_out());
        assert!(cycle.falling1.is_timed_out());
        assert!(cycle.rising2.is_timed_out());
        // Only the rising wait spent its budget
        assert_eq!(bench.tick(), 1_000);
        assert_eq!(bench.stats().wait_timeouts, 1);
    }

    #[test]
    fn test_full_cycle_stuck_high() {
        let mut bench = bench(WaveformDevice::constant(line(), Level::High));
        let cycle = bench.await_full_cycle(line(), 500);
        assert!(cycle.sync.is_timed_out());
        assert!(cycle.rising1.is_timed_out());
        assert_eq!(bench.tick(), 500);
    }
}
