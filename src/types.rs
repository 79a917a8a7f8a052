//! Core type definitions for the testbench.
//!
//! All timing is expressed either as a tick count or as simulated time
//! derived from ticks.

/// Simulated time in the clock's base unit (nanoseconds by default).
///
/// Every timestamp reported by the synchronizer and every duration reported
/// by the analyzer uses this unit.
pub type SimTime = u64;

/// Index of one clock tick since the testbench was created.
pub type Tick = u64;

/// A number of ticks, used for delays and timeout budgets.
pub type TickCount = u64;

/// Address of a device register on the configuration bus (7 bits used).
pub type RegisterAddress = u8;
