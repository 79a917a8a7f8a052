//! Signal lines shared between the testbench and the device.
//!
//! Two classes of lines exist, each with exactly one writer:
//! - [`BusLines`]: select, clock and data of the configuration bus, written
//!   only by the bus encoder.
//! - [`OutputLines`]: the device's two 8-bit output buses, written only by
//!   the device and read by the synchronizer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RegisterAddress;

/// Logic level of a single line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    pub fn is_low(self) -> bool {
        self == Level::Low
    }

    /// Level of bit `bit` in `value`.
    pub fn of_bit(value: u8, bit: u8) -> Self {
        Level::from((value >> bit) & 1 == 1)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// State of the three configuration bus lines.
///
/// Select is active low.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusLines {
    /// Chip select, active low
    pub select_n: Level,
    /// Serial data from the testbench to the device
    pub data: Level,
    /// Bus clock; the device samples data on its rising edge
    pub clock: Level,
}

impl BusLines {
    /// Bus at rest: select deasserted, data and clock low.
    pub const IDLE: BusLines = BusLines {
        select_n: Level::High,
        data: Level::Low,
        clock: Level::Low,
    };

    /// Lines while a transaction drives `data` with the given clock level.
    pub fn selected(data: Level, clock: Level) -> Self {
        Self {
            select_n: Level::Low,
            data,
            clock,
        }
    }

    /// True while select is asserted.
    pub fn is_selected(&self) -> bool {
        self.select_n.is_low()
    }

    /// Packs the lines into the device input byte: bit 0 clock, bit 1 data,
    /// bit 2 select.
    pub fn to_bits(&self) -> u8 {
        (u8::from(self.select_n) << 2) | (u8::from(self.data) << 1) | u8::from(self.clock)
    }

    /// Inverse of [`BusLines::to_bits`]; upper bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            select_n: Level::of_bit(bits, 2),
            data: Level::of_bit(bits, 1),
            clock: Level::of_bit(bits, 0),
        }
    }
}

impl Default for BusLines {
    fn default() -> Self {
        Self::IDLE
    }
}

impl fmt::Display for BusLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.to_bits())
    }
}

/// One of the device's two 8-bit output buses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputBus {
    /// Dedicated outputs, configured through registers 0x00 and 0x02
    Out,
    /// Bidirectional pins driven as outputs, configured through 0x01 and 0x03
    InOut,
}

impl OutputBus {
    /// Register holding the per-bit output-enable mask for this bus.
    pub fn enable_register(self) -> RegisterAddress {
        match self {
            OutputBus::Out => 0x00,
            OutputBus::InOut => 0x01,
        }
    }

    /// Register holding the per-bit PWM-select mask for this bus.
    pub fn pwm_select_register(self) -> RegisterAddress {
        match self {
            OutputBus::Out => 0x02,
            OutputBus::InOut => 0x03,
        }
    }
}

impl fmt::Display for OutputBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputBus::Out => write!(f, "uo_out"),
            OutputBus::InOut => write!(f, "uio_out"),
        }
    }
}

/// Identifies a single output line: a bus and a bit position on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId {
    pub bus: OutputBus,
    pub bit: u8,
}

impl LineId {
    /// # Panics
    /// Panics if `bit` is not in `0..8`.
    pub fn new(bus: OutputBus, bit: u8) -> Self {
        assert!(bit < 8, "output bit {bit} out of range");
        Self { bus, bit }
    }

    /// All sixteen output lines, `Out` bus first.
    pub fn all() -> impl Iterator<Item = LineId> {
        [OutputBus::Out, OutputBus::InOut]
            .into_iter()
            .flat_map(|bus| (0..8).map(move |bit| LineId { bus, bit }))
    }

    /// Single-bit mask of this line within its bus.
    pub fn mask(&self) -> u8 {
        1 << self.bit
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.bus, self.bit)
    }
}

/// Snapshot of both device output buses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct OutputLines {
    pub out: u8,
    pub inout: u8,
}

impl OutputLines {
    pub fn new(out: u8, inout: u8) -> Self {
        Self { out, inout }
    }

    /// Value of a whole bus.
    pub fn bus(&self, bus: OutputBus) -> u8 {
        match bus {
            OutputBus::Out => self.out,
            OutputBus::InOut => self.inout,
        }
    }

    /// Level of a single line.
    pub fn level(&self, line: LineId) -> Level {
        Level::of_bit(self.bus(line.bus), line.bit)
    }
}
