//! The device-under-test seam.
//!
//! The testbench never looks inside a device. It drives [`BusLines`] and
//! reads [`OutputLines`]; everything in between is the device's business.
//!
//! # Available Devices
//!
//! - [`PwmPeripheral`] - behavioral model of the register-configured PWM block
//! - [`WaveformDevice`] - plays back a fixed waveform on one line, for
//!   exercising the synchronizer against hand-built edge cases

pub mod mock;
pub mod pwm;

pub use mock::WaveformDevice;
pub use pwm::{PwmPeripheral, PwmTiming};

use crate::lines::{BusLines, OutputLines};
use crate::types::SimTime;

/// A device attached to the testbench.
///
/// Called once per tick, before the active task is polled, so that a task
/// observes the outputs produced at the current tick.
pub trait Device: Send {
    /// Returns the device to its power-on state.
    ///
    /// Called on every tick while reset is held.
    fn reset(&mut self);

    /// Advances the device by one tick.
    ///
    /// # Arguments
    /// * `time` - Simulated time of the tick
    /// * `bus` - Bus lines as left by the testbench at the end of the previous tick
    fn on_tick(&mut self, time: SimTime, bus: BusLines);

    /// Current output lines.
    fn outputs(&self) -> OutputLines;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "device"
    }
}

impl<D: Device + ?Sized> Device for Box<D> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn on_tick(&mut self, time: SimTime, bus: BusLines) {
        (**self).on_tick(time, bus)
    }

    fn outputs(&self) -> OutputLines {
        (**self).outputs()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
