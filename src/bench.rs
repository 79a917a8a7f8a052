//! The tick-driven testbench executor.
//!
//! `Testbench` owns the clock, the device and the bus lines. It advances time
//! one tick at a time and, at each tick:
//!
//! 1. advances the clock,
//! 2. lets the device process the tick against the bus lines as they were
//!    left at the end of the previous tick,
//! 3. polls the active task, which may read outputs and drive new bus lines.
//!
//! A bus write made on tick *n* is therefore seen by the device on tick
//! *n + 1*, and no read ever observes a half-applied write.
//!
//! # Example
//!
//! ```
//! use buswave::{BenchConfig, Testbench};
//! use buswave::device::PwmPeripheral;
//!
//! let mut bench = Testbench::new(BenchConfig::default(), PwmPeripheral::new());
//! bench.reset();
//! assert_eq!(bench.tick(), 10);
//! assert_eq!(bench.now(), 1_000);
//! ```

use serde::Serialize;
use tracing::{debug, trace};

use crate::clock::SimClock;
use crate::config::BenchConfig;
use crate::device::Device;
use crate::event::LineTransition;
use crate::lines::{BusLines, Level, LineId, OutputLines};
use crate::monitor::BusTrace;
use crate::task::{BenchTask, Delay, TaskPoll, TickContext};
use crate::types::{SimTime, Tick, TickCount};

/// Ticks the device is held in reset.
pub const RESET_HOLD_TICKS: TickCount = 5;

/// Ticks run after reset is released before the bench is used.
pub const RESET_RELEASE_TICKS: TickCount = 5;

/// Counters collected by the testbench.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BenchStats {
    /// Total number of ticks executed
    pub ticks_executed: u64,
    /// Tasks run to completion
    pub tasks_completed: u64,
    /// Bus transactions encoded
    pub transactions: u64,
    /// Frames rejected before reaching the bus
    pub frames_rejected: u64,
    /// Waveform measurements performed
    pub measurements: u64,
    /// Synchronizer waits that ran out of budget
    pub wait_timeouts: u64,
    /// Resets performed
    pub resets: u64,
}

/// A device on a simulated clock, driven through cooperative tasks.
pub struct Testbench<D: Device> {
    config: BenchConfig,
    clock: SimClock,
    device: D,
    /// Bus lines as last driven
    bus: BusLines,
    /// True while the device is held in reset
    in_reset: bool,
    trace: BusTrace,
    pub(crate) stats: BenchStats,
}

impl<D: Device> Testbench<D> {
    /// Creates a testbench at tick 0 with the bus idle.
    ///
    /// The configuration is assumed valid; configurations loaded through
    /// [`BenchConfig`] are validated on load.
    pub fn new(config: BenchConfig, device: D) -> Self {
        let clock = config.clock.build();
        Self {
            config,
            clock,
            device,
            bus: BusLines::IDLE,
            in_reset: false,
            trace: BusTrace::new(),
            stats: BenchStats::default(),
        }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Current tick index.
    pub fn tick(&self) -> Tick {
        self.clock.tick()
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Bus lines as last driven.
    pub fn bus_lines(&self) -> BusLines {
        self.bus
    }

    /// Device outputs at the current tick.
    pub fn outputs(&self) -> OutputLines {
        self.device.outputs()
    }

    /// Level of one output line at the current tick.
    pub fn line_level(&self, line: LineId) -> Level {
        self.outputs().level(line)
    }

    /// Every bus line change since creation or the last [`Testbench::clear_trace`].
    pub fn trace(&self) -> &BusTrace {
        &self.trace
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    pub fn stats(&self) -> &BenchStats {
        &self.stats
    }

    /// Returns the device to a known state.
    ///
    /// Drives the bus idle, holds the device in reset for
    /// [`RESET_HOLD_TICKS`], then runs [`RESET_RELEASE_TICKS`] more ticks.
    /// Calling it twice in a row leaves the device in the same state.
    pub fn reset(&mut self) {
        debug!(device = self.device.name(), tick = self.tick(), "reset");
        self.drive(BusLines::IDLE);
        self.in_reset = true;
        self.wait_ticks(RESET_HOLD_TICKS);
        self.in_reset = false;
        self.wait_ticks(RESET_RELEASE_TICKS);
        self.stats.resets += 1;
    }

    /// Lets `ticks` ticks elapse without touching the bus.
    pub fn wait_ticks(&mut self, ticks: TickCount) {
        self.run_task(Delay::new(ticks));
    }

    /// Runs a task to completion.
    ///
    /// The task is polled at the current instant and then after every tick
    /// until it is ready.
    pub fn run_task<T: BenchTask>(&mut self, mut task: T) -> T::Output {
        let start = self.tick();
        loop {
            let mut ctx =
                TickContext::new(self.tick(), self.now(), self.device.outputs(), self.bus);
            let poll = task.poll(&mut ctx);
            self.drive(ctx.into_bus());

            if let TaskPoll::Ready(output) = poll {
                trace!(
                    task = task.name(),
                    ticks = self.tick() - start,
                    "task complete"
                );
                self.stats.tasks_completed += 1;
                return output;
            }
            self.step();
        }
    }

    /// Applies new bus lines, recording a transition if anything changed.
    fn drive(&mut self, lines: BusLines) {
        if lines == self.bus {
            return;
        }
        self.trace.record(LineTransition {
            tick: self.tick(),
            time: self.now(),
            before: self.bus,
            after: lines,
        });
        self.bus = lines;
    }

    /// Executes a single tick.
    fn step(&mut self) {
        self.clock.advance();
        if self.in_reset {
            self.device.reset();
        } else {
            self.device.on_tick(self.clock.now(), self.bus);
        }
        self.stats.ticks_executed += 1;
    }

    /// Exports statistics as JSON.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "device": self.device.name(),
            "current_tick": self.tick(),
            "current_time": self.now(),
            "clock_period": self.clock.period(),
            "ticks_executed": self.stats.ticks_executed,
            "tasks_completed": self.stats.tasks_completed,
            "transactions": self.stats.transactions,
            "frames_rejected": self.stats.frames_rejected,
            "measurements": self.stats.measurements,
            "wait_timeouts": self.stats.wait_timeouts,
            "resets": self.stats.resets,
            "bus_transitions": self.trace.len(),
        })
    }
}
