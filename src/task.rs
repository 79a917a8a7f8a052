//! Cooperative tasks driven by the testbench clock.
//!
//! Every timed operation (shifting a bus bit, waiting for a level, settling)
//! is a [`BenchTask`]: a small state machine that the testbench polls once at
//! the current instant and then once after every tick until it reports
//! [`TaskPoll::Ready`]. Each `Pending` is a suspension point; between two
//! polls exactly one tick elapses and nothing else mutates the lines.

use crate::lines::{BusLines, Level, LineId, OutputLines};
use crate::types::{SimTime, Tick, TickCount};

/// Outcome of polling a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskPoll<T> {
    /// Suspend until the next tick.
    Pending,
    /// Finished with a value.
    Ready(T),
}

/// The view of the testbench a task gets while it is polled.
///
/// Outputs are a snapshot taken after the device has processed the current
/// tick. Bus writes are collected and applied once the poll returns, so the
/// device sees them on the following tick.
#[derive(Debug)]
pub struct TickContext {
    tick: Tick,
    time: SimTime,
    outputs: OutputLines,
    bus: BusLines,
}

impl TickContext {
    pub(crate) fn new(tick: Tick, time: SimTime, outputs: OutputLines, bus: BusLines) -> Self {
        Self {
            tick,
            time,
            outputs,
            bus,
        }
    }

    /// Current tick index.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.time
    }

    /// Device outputs at this tick.
    pub fn outputs(&self) -> OutputLines {
        self.outputs
    }

    /// Level of one output line at this tick.
    pub fn level(&self, line: LineId) -> Level {
        self.outputs.level(line)
    }

    /// Bus lines as they will be after this poll.
    pub fn bus(&self) -> BusLines {
        self.bus
    }

    /// Drives the bus lines. The last value driven during a poll wins.
    pub fn drive(&mut self, lines: BusLines) {
        self.bus = lines;
    }

    pub(crate) fn into_bus(self) -> BusLines {
        self.bus
    }
}

/// A unit of work scheduled on the testbench clock.
pub trait BenchTask {
    type Output;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "task"
    }

    /// Advances the task at the current instant.
    fn poll(&mut self, ctx: &mut TickContext) -> TaskPoll<Self::Output>;
}

/// Suspends for a fixed number of ticks.
#[derive(Clone, Debug)]
pub struct Delay {
    remaining: TickCount,
}

impl Delay {
    pub fn new(ticks: TickCount) -> Self {
        Self { remaining: ticks }
    }
}

impl BenchTask for Delay {
    type Output = ();

    fn name(&self) -> &str {
        "delay"
    }

    fn poll(&mut self, _ctx: &mut TickContext) -> TaskPoll<()> {
        if self.remaining == 0 {
            return TaskPoll::Ready(());
        }
        self.remaining -= 1;
        TaskPoll::Pending
    }
}
