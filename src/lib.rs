//! # buswave
//!
//! A tick-driven testbench for a register-configured PWM peripheral: it
//! encodes configuration frames onto a clocked serial bus and characterizes
//! the waveforms the device drives on its output lines.
//!
//! ## Design Principles
//!
//! - **Single timeline**: one [`SimClock`] drives both the device and the
//!   testbench; every timed operation is a cooperative [`BenchTask`] polled
//!   once per tick.
//! - **Race-free ordering**: bus lines written on tick *n* reach the device on
//!   tick *n + 1*; reads and writes never interleave within a tick.
//! - **Timeouts are values**: synchronizer waits return
//!   [`EdgeWait::TimedOut`] instead of failing, which is how static outputs
//!   are told apart from oscillating ones.
//! - **Black-box device**: the core only writes bus lines and reads output
//!   lines through the [`Device`] trait.
//!
//! ## Features
//!
//! - `parallel` - Run duty sweeps across a rayon thread pool
//!
//! ## Quick Start
//!
//! ```rust
//! use buswave::{BenchConfig, Classification, LineId, OutputBus, Testbench};
//! use buswave::device::PwmPeripheral;
//! use buswave::scenario;
//!
//! let mut bench = Testbench::new(BenchConfig::default(), PwmPeripheral::new());
//! bench.reset();
//!
//! let line = LineId::new(OutputBus::InOut, 0);
//! scenario::configure_pwm_output(&mut bench, line).unwrap();
//! scenario::set_duty(&mut bench, 128).unwrap();
//!
//! let result = bench.measure(line, 10_000).unwrap();
//! assert_eq!(result.classification, Classification::Oscillating);
//! println!("period: {:?} ns", result.period);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use buswave::BenchConfig;
//!
//! let config = BenchConfig::from_yaml_file("bench.yaml")?;
//! buswave::init_logging(&config.log_level);
//! ```

pub mod types;
pub mod clock;
pub mod lines;
pub mod event;
pub mod frame;
pub mod task;
pub mod bench;
pub mod encoder;
pub mod sync;
pub mod analyzer;
pub mod tolerance;
pub mod monitor;
pub mod device;
pub mod scenario;
pub mod sweep;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use types::{RegisterAddress, SimTime, Tick, TickCount};
pub use clock::{SimClock, TimeUnit};
pub use lines::{BusLines, Level, LineId, OutputBus, OutputLines};
pub use event::{EdgeEvent, EdgeKind, LineTransition};
pub use frame::{BusFrame, Direction, PayloadValue};
pub use task::{BenchTask, Delay, TaskPoll, TickContext};
pub use bench::{BenchStats, Testbench};
pub use encoder::BusEncoder;
pub use sync::{CycleTimestamps, EdgeWait, LevelWait};
pub use analyzer::{Classification, MeasurementResult};
pub use tolerance::{ToleranceBand, ToleranceViolation};
pub use monitor::{BusTrace, FrameDecoder};
pub use device::Device;
pub use sweep::{DutySweep, SweepPoint, SweepReport};
pub use config::{BenchConfig, BenchConfigBuilder, ConfigError};
pub use error::{BenchError, BenchResult, ValidationError};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level` when it is set. Call this once
/// at the start of a program.
///
/// # Example
///
/// ```rust,ignore
/// buswave::init_logging("debug");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
