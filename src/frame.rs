//! Configuration bus frames.
//!
//! A frame is sixteen bits on the wire:
//!
//! ```text
//!  15  14 ........ 8  7 ............ 0
//! [dir][ address:7 ][   payload:8    ]
//! ```
//!
//! Each byte is shifted most significant bit first, so bit 15 (direction) is
//! the first bit on the wire. Direction 1 is a write, 0 a read.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::lines::Level;
use crate::types::RegisterAddress;

/// Number of bits in one frame.
pub const FRAME_BITS: usize = 16;

/// Largest valid register address.
pub const MAX_ADDRESS: u32 = 0x7F;

/// Transfer direction of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Wire encoding of the direction bit.
    pub fn bit(self) -> u16 {
        match self {
            Direction::Read => 0,
            Direction::Write => 1,
        }
    }
}

impl From<bool> for Direction {
    /// `true` is a write, matching the wire encoding.
    fn from(write: bool) -> Self {
        if write {
            Direction::Write
        } else {
            Direction::Read
        }
    }
}

/// A value that can be carried as the 8-bit payload of a frame.
pub trait PayloadValue {
    /// Checks the range and narrows to a byte.
    fn to_payload(&self) -> Result<u8, ValidationError>;
}

impl PayloadValue for u8 {
    fn to_payload(&self) -> Result<u8, ValidationError> {
        Ok(*self)
    }
}

macro_rules! impl_wide_payload {
    ($($ty:ty),*) => {
        $(
            impl PayloadValue for $ty {
                fn to_payload(&self) -> Result<u8, ValidationError> {
                    u8::try_from(*self)
                        .map_err(|_| ValidationError::PayloadOutOfRange(*self as i64))
                }
            }
        )*
    };
}

impl_wide_payload!(u16, u32, u64, i32, i64);

/// Eight levels, most significant bit first.
impl PayloadValue for [Level; 8] {
    fn to_payload(&self) -> Result<u8, ValidationError> {
        Ok(self
            .iter()
            .fold(0u8, |acc, level| (acc << 1) | u8::from(*level)))
    }
}

/// A validated configuration transaction.
///
/// Construction goes through [`BusFrame::new`], so a `BusFrame` always holds
/// an address in `0..=127`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusFrame {
    direction: Direction,
    address: RegisterAddress,
    payload: u8,
}

impl BusFrame {
    /// Validates and builds a frame.
    pub fn new<P: PayloadValue + ?Sized>(
        direction: Direction,
        address: u32,
        payload: &P,
    ) -> Result<Self, ValidationError> {
        if address > MAX_ADDRESS {
            return Err(ValidationError::AddressOutOfRange(address as i64));
        }
        let payload = payload.to_payload()?;
        Ok(Self {
            direction,
            address: address as RegisterAddress,
            payload,
        })
    }

    /// Shorthand for a write frame.
    pub fn write(address: u32, payload: u8) -> Result<Self, ValidationError> {
        Self::new(Direction::Write, address, &payload)
    }

    /// Shorthand for a read frame.
    pub fn read(address: u32, payload: u8) -> Result<Self, ValidationError> {
        Self::new(Direction::Read, address, &payload)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn address(&self) -> RegisterAddress {
        self.address
    }

    pub fn payload(&self) -> u8 {
        self.payload
    }

    /// The sixteen-bit wire word.
    pub fn to_word(&self) -> u16 {
        (self.direction.bit() << 15) | ((self.address as u16) << 8) | self.payload as u16
    }

    /// Rebuilds a frame from a wire word. Every word is a valid frame.
    pub fn from_word(word: u16) -> Self {
        Self {
            direction: Direction::from(word >> 15 == 1),
            address: ((word >> 8) & 0x7F) as RegisterAddress,
            payload: (word & 0xFF) as u8,
        }
    }

    /// Bits in transmission order (direction first, payload LSB last).
    pub fn bits(&self) -> impl Iterator<Item = Level> {
        let word = self.to_word();
        (0..FRAME_BITS).map(move |i| Level::of_bit((word >> (FRAME_BITS - 1 - i)) as u8, 0))
    }

    /// Rebuilds a frame from bits in transmission order.
    ///
    /// Returns `None` unless exactly sixteen bits are given.
    pub fn from_bits(bits: &[Level]) -> Option<Self> {
        if bits.len() != FRAME_BITS {
            return None;
        }
        let word = bits
            .iter()
            .fold(0u16, |acc, level| (acc << 1) | u8::from(*level) as u16);
        Some(Self::from_word(word))
    }
}

impl fmt::Display for BusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} addr=0x{:02X} data=0x{:02X}",
            self.direction, self.address, self.payload
        )
    }
}
