//! Bus transaction encoder.
//!
//! Serializes a [`BusFrame`] onto the bus lines with exact timing:
//!
//! ```text
//! Idle -> AssertSelect -> ShiftBit x16 -> DeassertSelect -> Settle -> Idle
//! ```
//!
//! - `AssertSelect`: select driven low; `select_lead_ticks` elapse before the
//!   first bit.
//! - `ShiftBit`: the bit is driven with the bus clock low for
//!   `half_period_ticks`, then the clock is raised for another
//!   `half_period_ticks` with the bit held. The device samples on the rise.
//! - `DeassertSelect`: right after the sixteenth bit, select goes high and
//!   data/clock return to 0.
//! - `Settle`: `settle_ticks` elapse before the transaction completes.

use tracing::{debug, trace, warn};

use crate::bench::Testbench;
use crate::config::BusTiming;
use crate::device::Device;
use crate::error::BenchResult;
use crate::frame::{BusFrame, Direction, PayloadValue, FRAME_BITS};
use crate::lines::{BusLines, Level};
use crate::task::{BenchTask, TaskPoll, TickContext};
use crate::types::TickCount;

/// Phase of the encoder state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderPhase {
    Idle,
    AssertSelect,
    /// Bit `n` driven, bus clock low
    ShiftLow(usize),
    /// Bit `n` held, bus clock high
    ShiftHigh(usize),
    /// Select released, waiting before the bus is reused
    Settle,
    Done,
}

/// Task that shifts one frame onto the bus.
///
/// Completes with the idle line state left on the bus.
#[derive(Clone, Debug)]
pub struct BusEncoder {
    frame: BusFrame,
    bits: [Level; FRAME_BITS],
    timing: BusTiming,
    phase: EncoderPhase,
    /// Ticks left in the current phase
    wait: TickCount,
}

impl BusEncoder {
    pub fn new(frame: BusFrame, timing: BusTiming) -> Self {
        let mut bits = [Level::Low; FRAME_BITS];
        for (slot, bit) in bits.iter_mut().zip(frame.bits()) {
            *slot = bit;
        }
        Self {
            frame,
            bits,
            timing,
            phase: EncoderPhase::Idle,
            wait: 0,
        }
    }

    pub fn frame(&self) -> &BusFrame {
        &self.frame
    }

    pub fn phase(&self) -> EncoderPhase {
        self.phase
    }

    /// Leaves the current phase, drives the lines of the next one and arms
    /// its delay.
    fn advance(&mut self, ctx: &mut TickContext) {
        let half = self.timing.half_period_ticks;
        let (next, wait) = match self.phase {
            EncoderPhase::Idle => {
                ctx.drive(BusLines::selected(Level::Low, Level::Low));
                (EncoderPhase::AssertSelect, self.timing.select_lead_ticks)
            }
            EncoderPhase::AssertSelect => {
                ctx.drive(BusLines::selected(self.bits[0], Level::Low));
                (EncoderPhase::ShiftLow(0), half)
            }
            EncoderPhase::ShiftLow(n) => {
                ctx.drive(BusLines::selected(self.bits[n], Level::High));
                trace!(bit = n, level = %self.bits[n], tick = ctx.tick(), "bus clock rise");
                (EncoderPhase::ShiftHigh(n), half)
            }
            EncoderPhase::ShiftHigh(n) if n + 1 < FRAME_BITS => {
                ctx.drive(BusLines::selected(self.bits[n + 1], Level::Low));
                (EncoderPhase::ShiftLow(n + 1), half)
            }
            EncoderPhase::ShiftHigh(_) => {
                ctx.drive(BusLines::IDLE);
                (EncoderPhase::Settle, self.timing.settle_ticks)
            }
            EncoderPhase::Settle | EncoderPhase::Done => (EncoderPhase::Done, 0),
        };
        self.phase = next;
        self.wait = wait;
    }
}

impl BenchTask for BusEncoder {
    type Output = BusLines;

    fn name(&self) -> &str {
        "bus_encoder"
    }

    fn poll(&mut self, ctx: &mut TickContext) -> TaskPoll<BusLines> {
        if self.wait > 0 {
            self.wait -= 1;
            if self.wait > 0 {
                return TaskPoll::Pending;
            }
        }
        // Zero-length phases fall straight through to the next one
        loop {
            self.advance(ctx);
            if self.phase == EncoderPhase::Done {
                return TaskPoll::Ready(ctx.bus());
            }
            if self.wait > 0 {
                return TaskPoll::Pending;
            }
        }
    }
}

impl<D: Device> Testbench<D> {
    /// Encodes one transaction onto the bus.
    ///
    /// The frame is validated before any line moves; on a
    /// [`crate::error::ValidationError`] no tick elapses and no transition is
    /// recorded. On success returns the idle line state left on the bus.
    pub fn encode<P: PayloadValue + ?Sized>(
        &mut self,
        direction: Direction,
        address: u32,
        payload: &P,
    ) -> BenchResult<BusLines> {
        let frame = match BusFrame::new(direction, address, payload) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "rejected bus frame");
                self.stats.frames_rejected += 1;
                return Err(err.into());
            }
        };
        Ok(self.send_frame(frame))
    }

    /// Shorthand for a write transaction.
    pub fn write(&mut self, address: u32, payload: u8) -> BenchResult<BusLines> {
        self.encode(Direction::Write, address, &payload)
    }

    /// Shifts an already validated frame onto the bus.
    pub fn send_frame(&mut self, frame: BusFrame) -> BusLines {
        let start = self.tick();
        debug!(%frame, tick = start, "bus transaction");
        let encoder = BusEncoder::new(frame, self.config().bus.clone());
        let lines = self.run_task(encoder);
        self.stats.transactions += 1;
        trace!(ticks = self.tick() - start, "bus ready");
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;
    use crate::device::PwmPeripheral;
    use crate::error::{BenchError, ValidationError};

    fn bench() -> Testbench<PwmPeripheral> {
        Testbench::new(BenchConfig::default(), PwmPeripheral::new())
    }

    #[test]
    fn test_transaction_duration() {
        let mut bench = bench();
        let lines = bench.write(0x04, 0x80).unwrap();
        assert_eq!(lines, BusLines::IDLE);
        assert_eq!(bench.tick(), 2_201);
        assert_eq!(bench.bus_lines(), BusLines::IDLE);
    }

    #[test]
    fn test_select_leads_first_bit_by_one_tick() {
        let mut bench = bench();
        // First data bit is 1 for a write, so the data line moves at tick 1
        bench.write(0x00, 0x00).unwrap();
        let transitions = bench.trace().transitions();
        assert_eq!(transitions[0].tick, 0);
        assert!(transitions[0].is_select());
        assert_eq!(transitions[1].tick, 1);
        assert_eq!(transitions[1].after.data, Level::High);
        assert_eq!(transitions[1].after.clock, Level::Low);
    }

    #[test]
    fn test_bit_timing() {
        let mut bench = bench();
        bench.write(0x7F, 0xFF).unwrap();
        let rises: Vec<u64> = bench
            .trace()
            .transitions()
            .iter()
            .filter(|t| t.is_clock_rise())
            .map(|t| t.tick)
            .collect();
        assert_eq!(rises.len(), 16);
        assert_eq!(rises[0], 51);
        for pair in rises.windows(2) {
            assert_eq!(pair[1] - pair[0], 100);
        }
    }

    #[test]
    fn test_deselect_after_last_bit_then_settle() {
        let mut bench = bench();
        bench.write(0x01, 0xCC).unwrap();
        let last = bench.trace().transitions().last().copied().unwrap();
        assert!(last.is_deselect());
        assert_eq!(last.after, BusLines::IDLE);
        assert_eq!(last.tick, 1 + 16 * 100);
        assert_eq!(bench.tick() - last.tick, 600);
    }

    #[test]
    fn test_validation_leaves_bus_untouched() {
        let mut bench = bench();
        let err = bench.encode(Direction::Write, 200, &0x10u8).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::AddressOutOfRange(200))
        ));
        let err = bench.encode(Direction::Write, 4, &300u32).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::PayloadOutOfRange(300))
        ));
        assert_eq!(bench.tick(), 0);
        assert!(bench.trace().is_empty());
        assert_eq!(bench.stats().frames_rejected, 2);
        assert_eq!(bench.stats().transactions, 0);
    }

    #[test]
    fn test_zero_settle() {
        let config = crate::config::BenchConfigBuilder::new()
            .half_period_ticks(2)
            .settle_ticks(0)
            .build()
            .unwrap();
        let mut bench = Testbench::new(config, PwmPeripheral::new());
        bench.write(0x00, 0x01).unwrap();
        assert_eq!(bench.tick(), 1 + 16 * 4);
        // The device latches the frame on the tick after select is released
        bench.wait_ticks(1);
        assert_eq!(bench.device().register(0x00), Some(0x01));
    }

    #[test]
    fn test_encoder_phases() {
        let mut encoder = BusEncoder::new(BusFrame::write(0, 0).unwrap(), BusTiming::default());
        let mut ctx = TickContext::new(0, 0, Default::default(), BusLines::IDLE);
        assert_eq!(encoder.phase(), EncoderPhase::Idle);
        assert_eq!(encoder.poll(&mut ctx), TaskPoll::Pending);
        assert_eq!(encoder.phase(), EncoderPhase::AssertSelect);
        assert_eq!(encoder.poll(&mut ctx), TaskPoll::Pending);
        assert_eq!(encoder.phase(), EncoderPhase::ShiftLow(0));
    }
}
