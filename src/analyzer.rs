//! Waveform characterization.
//!
//! [`Testbench::measure`] captures one full cycle of an output line and
//! reduces it to a [`MeasurementResult`]:
//!
//! | sync | rising1 | falling1 | rising2 | classification |
//! |------|---------|----------|---------|----------------|
//! | timed out | - | - | - | `StaticHigh` |
//! | seen | timed out | - | - | `StaticLow` |
//! | seen | seen | timed out | - | `StaticHigh` |
//! | seen | seen | seen | seen | `Oscillating` |
//! | seen | seen | seen | timed out | `TimedOut` |

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bench::Testbench;
use crate::clock::TimeUnit;
use crate::device::Device;
use crate::error::{BenchError, BenchResult};
use crate::lines::LineId;
use crate::sync::{CycleTimestamps, EdgeWait};
use crate::types::{SimTime, TickCount};

/// Qualitative outcome of one measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// A full cycle was captured
    Oscillating,
    /// The line stayed high
    StaticHigh,
    /// The line stayed low
    StaticLow,
    /// The capture stopped part way; nothing can be concluded
    TimedOut,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Oscillating => "oscillating",
            Classification::StaticHigh => "static high",
            Classification::StaticLow => "static low",
            Classification::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

/// Maps the outcome of a full-cycle capture to a classification.
pub fn classify(cycle: &CycleTimestamps) -> Classification {
    match (cycle.sync, cycle.rising1, cycle.falling1, cycle.rising2) {
        (EdgeWait::TimedOut, ..) => Classification::StaticHigh,
        (_, EdgeWait::TimedOut, ..) => Classification::StaticLow,
        (_, _, EdgeWait::TimedOut, _) => Classification::StaticHigh,
        (_, _, _, EdgeWait::Observed(_)) => Classification::Oscillating,
        _ => Classification::TimedOut,
    }
}

/// Result of characterizing one output line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub line: LineId,
    pub classification: Classification,
    /// Raw timestamps the result was derived from
    pub cycle: CycleTimestamps,
    /// `rising2 - rising1`; present only when oscillating
    pub period: Option<SimTime>,
    /// `falling1 - rising1`; present only when oscillating
    pub high_time: Option<SimTime>,
    /// Unit of `period` and `high_time`
    pub unit: TimeUnit,
}

impl MeasurementResult {
    /// Builds a result from a capture, checking edge ordering.
    ///
    /// An oscillating capture whose edges are not strictly increasing is a
    /// synchronizer bug and is reported as [`BenchError::InvariantViolation`].
    pub fn from_cycle(
        line: LineId,
        cycle: CycleTimestamps,
        unit: TimeUnit,
    ) -> BenchResult<Self> {
        let classification = classify(&cycle);
        let (period, high_time) = match (cycle.rising1, cycle.falling1, cycle.rising2) {
            (EdgeWait::Observed(r1), EdgeWait::Observed(f1), EdgeWait::Observed(r2))
                if classification == Classification::Oscillating =>
            {
                if !(r1.time < f1.time && f1.time < r2.time) {
                    return Err(BenchError::InvariantViolation(format!(
                        "edges out of order on {line}: rising {} falling {} rising {}",
                        r1.time, f1.time, r2.time
                    )));
                }
                (Some(r2.time - r1.time), Some(f1.time - r1.time))
            }
            _ => (None, None),
        };
        Ok(Self {
            line,
            classification,
            cycle,
            period,
            high_time,
            unit,
        })
    }

    pub fn is_oscillating(&self) -> bool {
        self.classification == Classification::Oscillating
    }

    /// `high_time / period`, when oscillating.
    pub fn duty_ratio(&self) -> Option<f64> {
        match (self.high_time, self.period) {
            (Some(high), Some(period)) => Some(high as f64 / period as f64),
            _ => None,
        }
    }

    /// Period in seconds, when oscillating.
    pub fn period_secs(&self) -> Option<f64> {
        self.period.map(|p| self.unit.to_secs(p))
    }

    /// Frequency in hertz, when oscillating.
    pub fn frequency_hz(&self) -> Option<f64> {
        self.period_secs().map(|p| 1.0 / p)
    }
}

impl fmt::Display for MeasurementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.period, self.high_time, self.duty_ratio()) {
            (Some(period), Some(high), Some(ratio)) => write!(
                f,
                "{}: {} period={} high={} duty={:.4}",
                self.line, self.classification, period, high, ratio
            ),
            _ => write!(f, "{}: {}", self.line, self.classification),
        }
    }
}

impl<D: Device> Testbench<D> {
    /// Characterizes the waveform on `line`.
    ///
    /// Each synchronizer step may take up to `timeout_ticks`. Timeouts are
    /// folded into the classification; the only error is an edge-ordering
    /// violation.
    pub fn measure(
        &mut self,
        line: LineId,
        timeout_ticks: TickCount,
    ) -> BenchResult<MeasurementResult> {
        let cycle = self.await_full_cycle(line, timeout_ticks);
        let result = MeasurementResult::from_cycle(line, cycle, self.clock().unit())?;
        self.stats.measurements += 1;
        info!(
            %line,
            classification = %result.classification,
            period = ?result.period,
            high_time = ?result.high_time,
            "measurement"
        );
        Ok(result)
    }

    /// [`Testbench::measure`] with the configured timeout.
    pub fn measure_default(&mut self, line: LineId) -> BenchResult<MeasurementResult> {
        let timeout = self.config().measurement.timeout_ticks;
        self.measure(line, timeout)
    }
}
