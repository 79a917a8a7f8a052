//! Behavioral model of the register-configured PWM peripheral.
//!
//! The model follows the device's external contract only:
//!
//! | Register | Meaning |
//! |----------|---------|
//! | 0x00 | output enable mask, `uo_out` |
//! | 0x01 | output enable mask, `uio_out` |
//! | 0x02 | PWM select mask, `uo_out` |
//! | 0x03 | PWM select mask, `uio_out` |
//! | 0x04 | duty cycle, shared by every PWM-selected bit |
//!
//! An enabled bit that is not PWM-selected is driven high; an enabled,
//! PWM-selected bit follows the PWM signal; a disabled bit is low. Writes to
//! other addresses and all reads are accepted on the bus and dropped.
//!
//! # Example
//!
//! ```
//! use buswave::device::{Device, PwmPeripheral};
//! use buswave::lines::BusLines;
//!
//! let mut dut = PwmPeripheral::new();
//! dut.reset();
//! dut.on_tick(100, BusLines::IDLE);
//! assert_eq!(dut.outputs().out, 0);
//! ```

use tracing::{debug, trace};

use crate::device::Device;
use crate::frame::{BusFrame, Direction, FRAME_BITS};
use crate::lines::{BusLines, OutputLines};
use crate::types::{RegisterAddress, SimTime};

/// Number of implemented registers (0x00..=0x04).
pub const REGISTER_COUNT: usize = 5;

/// Address of the duty-cycle register.
pub const DUTY_REGISTER: RegisterAddress = 0x04;

/// Steps in one PWM period; duty values are compared against the step index.
pub const PWM_STEPS: u64 = 256;

/// Rates that fix the PWM period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PwmTiming {
    /// Frequency of the device clock
    pub clock_hz: u64,
    /// Frequency of the PWM output
    pub output_hz: u64,
}

impl Default for PwmTiming {
    /// 10 MHz clock, 3 kHz output.
    fn default() -> Self {
        Self {
            clock_hz: 10_000_000,
            output_hz: 3_000,
        }
    }
}

impl PwmTiming {
    pub fn new(clock_hz: u64, output_hz: u64) -> Self {
        Self {
            clock_hz,
            output_hz,
        }
    }

    /// Step index (0..256) reached after `ticks` device clock cycles.
    ///
    /// The step rate is `output_hz * 256`; it does not divide the clock
    /// evenly, so individual periods alternate between the two nearest
    /// whole tick counts while the average stays exact.
    pub fn step_at(&self, ticks: u64) -> u64 {
        let steps = ticks as u128 * self.output_hz as u128 * PWM_STEPS as u128
            / self.clock_hz as u128;
        (steps % PWM_STEPS as u128) as u64
    }

    /// Average PWM period in device clock cycles.
    pub fn period_ticks(&self) -> f64 {
        self.clock_hz as f64 / self.output_hz as f64
    }
}

/// Receiver half of the configuration bus.
#[derive(Clone, Debug, Default)]
struct FrameReceiver {
    prev: Option<BusLines>,
    shift: u16,
    bits: usize,
}

impl FrameReceiver {
    /// Feeds one tick of bus state; returns a frame when select deasserts
    /// after exactly sixteen bits.
    fn sample(&mut self, bus: BusLines) -> Option<BusFrame> {
        let prev = self.prev.replace(bus).unwrap_or(BusLines::IDLE);

        if bus.is_selected() {
            if !prev.is_selected() {
                self.shift = 0;
                self.bits = 0;
            }
            if prev.clock.is_low() && bus.clock.is_high() {
                self.shift = (self.shift << 1) | u8::from(bus.data) as u16;
                self.bits += 1;
                trace!(bit = self.bits, level = %bus.data, "sampled bus bit");
            }
            return None;
        }

        if prev.is_selected() {
            let bits = std::mem::take(&mut self.bits);
            if bits == FRAME_BITS {
                return Some(BusFrame::from_word(self.shift));
            }
            debug!(bits, "discarding incomplete frame");
        }
        None
    }
}

/// Behavioral PWM peripheral configured over the bus.
#[derive(Clone, Debug)]
pub struct PwmPeripheral {
    timing: PwmTiming,
    registers: [u8; REGISTER_COUNT],
    receiver: FrameReceiver,
    /// Ticks since reset was released
    ticks: u64,
    outputs: OutputLines,
    /// Frames committed to a register
    pub frames_applied: u64,
    /// Frames accepted on the bus but ignored
    pub frames_dropped: u64,
}

impl PwmPeripheral {
    /// Creates a peripheral with the default 10 MHz / 3 kHz timing.
    pub fn new() -> Self {
        Self::with_timing(PwmTiming::default())
    }

    pub fn with_timing(timing: PwmTiming) -> Self {
        Self {
            timing,
            registers: [0; REGISTER_COUNT],
            receiver: FrameReceiver::default(),
            ticks: 0,
            outputs: OutputLines::default(),
            frames_applied: 0,
            frames_dropped: 0,
        }
    }

    /// Register contents, for inspecting the model itself.
    pub fn register(&self, address: RegisterAddress) -> Option<u8> {
        self.registers.get(address as usize).copied()
    }

    pub fn timing(&self) -> PwmTiming {
        self.timing
    }

    fn apply(&mut self, frame: BusFrame) {
        let index = frame.address() as usize;
        if frame.direction() == Direction::Write && index < REGISTER_COUNT {
            debug!(%frame, "register write");
            self.registers[index] = frame.payload();
            self.frames_applied += 1;
        } else {
            debug!(%frame, "frame ignored");
            self.frames_dropped += 1;
        }
    }

    fn pwm_level(&self) -> bool {
        match self.registers[DUTY_REGISTER as usize] {
            0 => false,
            255 => true,
            duty => self.timing.step_at(self.ticks) < duty as u64,
        }
    }

    fn drive(&self, enable: u8, pwm_select: u8, pwm: bool) -> u8 {
        let pwm_mask = if pwm { 0xFF } else { !pwm_select };
        enable & pwm_mask
    }

    fn update_outputs(&mut self) {
        let pwm = self.pwm_level();
        let [en_out, en_inout, sel_out, sel_inout, _] = self.registers;
        self.outputs = OutputLines {
            out: self.drive(en_out, sel_out, pwm),
            inout: self.drive(en_inout, sel_inout, pwm),
        };
    }
}

impl Default for PwmPeripheral {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for PwmPeripheral {
    fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.receiver = FrameReceiver::default();
        self.ticks = 0;
        self.outputs = OutputLines::default();
    }

    fn on_tick(&mut self, _time: SimTime, bus: BusLines) {
        if let Some(frame) = self.receiver.sample(bus) {
            self.apply(frame);
        }
        self.ticks += 1;
        self.update_outputs();
    }

    fn outputs(&self) -> OutputLines {
        self.outputs
    }

    fn name(&self) -> &str {
        "pwm_peripheral"
    }
}
