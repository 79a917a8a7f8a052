//! Acceptance bands for measured waveforms.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyzer::{Classification, MeasurementResult};
use crate::error::{BenchError, BenchResult};

/// Denominator relating the duty register to the output duty ratio.
pub const DUTY_DENOMINATOR: u32 = 256;

/// An acceptance band around an expected value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToleranceBand {
    /// Fraction of the expected value, e.g. `0.01` for ±1 %
    Relative(f64),
    /// Fixed distance from the expected value
    Absolute(f64),
}

impl ToleranceBand {
    /// Inclusive `(lower, upper)` bounds around `expected`.
    pub fn bounds(&self, expected: f64) -> (f64, f64) {
        let delta = match *self {
            ToleranceBand::Relative(fraction) => (expected * fraction).abs(),
            ToleranceBand::Absolute(delta) => delta.abs(),
        };
        (expected - delta, expected + delta)
    }

    pub fn contains(&self, expected: f64, measured: f64) -> bool {
        let (lower, upper) = self.bounds(expected);
        (lower..=upper).contains(&measured)
    }
}

impl fmt::Display for ToleranceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToleranceBand::Relative(fraction) => write!(f, "±{}%", fraction * 100.0),
            ToleranceBand::Absolute(delta) => write!(f, "±{delta}"),
        }
    }
}

/// The measured quantity a band applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Frequency,
    Period,
    HighTime,
    DutyRatio,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Frequency => "frequency",
            Quantity::Period => "period",
            Quantity::HighTime => "high time",
            Quantity::DutyRatio => "duty ratio",
        };
        f.write_str(name)
    }
}

/// A measurement outside its acceptance band.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{quantity} {measured} outside {band} of {expected} (accepted {lower}..={upper})")]
pub struct ToleranceViolation {
    pub quantity: Quantity,
    pub expected: f64,
    pub measured: f64,
    pub band: ToleranceBand,
    pub lower: f64,
    pub upper: f64,
}

/// Checks one value against a band.
pub fn check(
    quantity: Quantity,
    expected: f64,
    measured: f64,
    band: ToleranceBand,
) -> Result<(), ToleranceViolation> {
    let (lower, upper) = band.bounds(expected);
    if (lower..=upper).contains(&measured) {
        return Ok(());
    }
    Err(ToleranceViolation {
        quantity,
        expected,
        measured,
        band,
        lower,
        upper,
    })
}

/// Duty ratio the device should produce for a register value.
pub fn expected_duty_ratio(duty: u8) -> f64 {
    duty_ratio(duty, DUTY_DENOMINATOR)
}

/// Duty ratio of a register value over an explicit denominator.
pub fn duty_ratio(duty: u8, denominator: u32) -> f64 {
    duty as f64 / denominator as f64
}

fn require_oscillating(result: &MeasurementResult) -> BenchResult<()> {
    if result.is_oscillating() {
        return Ok(());
    }
    Err(BenchError::UnexpectedClassification {
        line: result.line.to_string(),
        expected: Classification::Oscillating,
        actual: result.classification,
    })
}

/// Checks the frequency of an oscillating measurement.
pub fn check_frequency(
    result: &MeasurementResult,
    expected_hz: f64,
    band: ToleranceBand,
) -> BenchResult<f64> {
    require_oscillating(result)?;
    let measured = result.frequency_hz().unwrap_or_default();
    check(Quantity::Frequency, expected_hz, measured, band)?;
    Ok(measured)
}

/// Checks the duty ratio of an oscillating measurement.
pub fn check_duty(
    result: &MeasurementResult,
    expected_ratio: f64,
    band: ToleranceBand,
) -> BenchResult<f64> {
    require_oscillating(result)?;
    let measured = result.duty_ratio().unwrap_or_default();
    check(Quantity::DutyRatio, expected_ratio, measured, band)?;
    Ok(measured)
}

/// Checks the period, in the measurement's time unit.
pub fn check_period(
    result: &MeasurementResult,
    expected: f64,
    band: ToleranceBand,
) -> BenchResult<f64> {
    require_oscillating(result)?;
    let measured = result.period.unwrap_or_default() as f64;
    check(Quantity::Period, expected, measured, band)?;
    Ok(measured)
}

/// Checks the high time, in the measurement's time unit.
pub fn check_high_time(
    result: &MeasurementResult,
    expected: f64,
    band: ToleranceBand,
) -> BenchResult<f64> {
    require_oscillating(result)?;
    let measured = result.high_time.unwrap_or_default() as f64;
    check(Quantity::HighTime, expected, measured, band)?;
    Ok(measured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeUnit;
    use crate::event::{EdgeEvent, EdgeKind};
    use crate::lines::{LineId, OutputBus};
    use crate::sync::{CycleTimestamps, EdgeWait};

    fn line() -> LineId {
        LineId::new(OutputBus::Out, 0)
    }

    fn edge(kind: EdgeKind, time: u64) -> EdgeWait<EdgeEvent> {
        EdgeWait::Observed(EdgeEvent {
            kind,
            line: line(),
            tick: time / 100,
            time,
        })
    }

    /// 3 kHz at 50 % duty, in nanoseconds.
    fn oscillating() -> MeasurementResult {
        let cycle = CycleTimestamps {
            sync: EdgeWait::Observed(0),
            rising1: edge(EdgeKind::Rising, 1_000),
            falling1: edge(EdgeKind::Falling, 167_700),
            rising2: edge(EdgeKind::Rising, 334_300),
        };
        MeasurementResult::from_cycle(line(), cycle, TimeUnit::Ns).unwrap()
    }

    #[test]
    fn test_band_bounds() {
        assert_eq!(ToleranceBand::Absolute(0.5).bounds(2.0), (1.5, 2.5));
        let (lower, upper) = ToleranceBand::Relative(0.01).bounds(3000.0);
        assert!((lower - 2970.0).abs() < 1e-9);
        assert!((upper - 3030.0).abs() < 1e-9);
        assert!(ToleranceBand::Relative(0.01).contains(3000.0, 3029.0));
        assert!(!ToleranceBand::Relative(0.01).contains(3000.0, 3031.0));
    }

    #[test]
    fn test_expected_duty_ratio() {
        assert_eq!(expected_duty_ratio(128), 0.5);
        assert_eq!(expected_duty_ratio(0), 0.0);
        assert!((expected_duty_ratio(255) - 0.996).abs() < 0.001);
        assert_eq!(duty_ratio(255, 255), 1.0);
    }

    #[test]
    fn test_frequency_within_band() {
        let hz = check_frequency(&oscillating(), 3000.0, ToleranceBand::Relative(0.01)).unwrap();
        assert!((hz - 3000.0).abs() < 1.0);
    }

    #[test]
    fn test_duty_violation_reports_values() {
        let err = check_duty(&oscillating(), 0.25, ToleranceBand::Absolute(0.01)).unwrap_err();
        let violation = match err {
            BenchError::Tolerance(violation) => violation,
            other => panic!("expected tolerance violation, got {other:?}"),
        };
        assert_eq!(violation.quantity, Quantity::DutyRatio);
        assert_eq!(violation.expected, 0.25);
        assert!((violation.measured - 0.5).abs() < 0.001);
        assert!(violation.to_string().starts_with("duty ratio"));
    }

    #[test]
    fn test_period_and_high_time() {
        let result = oscillating();
        check_period(&result, 333_333.0, ToleranceBand::Relative(0.02)).unwrap();
        check_high_time(&result, 166_667.0, ToleranceBand::Relative(0.02)).unwrap();
    }

    #[test]
    fn test_static_measurement_rejected() {
        let cycle = CycleTimestamps {
            sync: EdgeWait::Observed(0),
            ..Default::default()
        };
        let result = MeasurementResult::from_cycle(line(), cycle, TimeUnit::Ns).unwrap();
        let err = check_frequency(&result, 3000.0, ToleranceBand::Relative(0.01)).unwrap_err();
        assert!(matches!(
            err,
            BenchError::UnexpectedClassification {
                actual: Classification::StaticLow,
                ..
            }
        ));
    }
}
