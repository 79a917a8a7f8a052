//! Scenario helpers for the PWM peripheral.
//!
//! These consume only the device's external contract: they write registers
//! over the bus and measure output lines. Nothing here reads device state.
//!
//! | Register | Meaning |
//! |----------|---------|
//! | 0x00 / 0x01 | output enable mask for `uo_out` / `uio_out` |
//! | 0x02 / 0x03 | PWM select mask for `uo_out` / `uio_out` |
//! | 0x04 | duty cycle |

use tracing::info;

use crate::analyzer::{Classification, MeasurementResult};
use crate::bench::Testbench;
use crate::device::Device;
use crate::error::{BenchError, BenchResult};
use crate::lines::{BusLines, LineId, OutputBus};
use crate::tolerance;
use crate::types::RegisterAddress;

/// Address of the duty-cycle register.
pub const DUTY_REGISTER: RegisterAddress = 0x04;

/// Writes one register.
pub fn write_register<D: Device>(
    bench: &mut Testbench<D>,
    address: RegisterAddress,
    value: u8,
) -> BenchResult<BusLines> {
    bench.write(address as u32, value)
}

/// Sets the output-enable mask of a bus.
pub fn enable_outputs<D: Device>(
    bench: &mut Testbench<D>,
    bus: OutputBus,
    mask: u8,
) -> BenchResult<()> {
    write_register(bench, bus.enable_register(), mask)?;
    Ok(())
}

/// Sets the PWM-select mask of a bus.
pub fn select_pwm<D: Device>(bench: &mut Testbench<D>, bus: OutputBus, mask: u8) -> BenchResult<()> {
    write_register(bench, bus.pwm_select_register(), mask)?;
    Ok(())
}

/// Enables `line` and routes the PWM signal to it.
///
/// Overwrites both masks of the line's bus, so every other line on that bus
/// is disabled.
pub fn configure_pwm_output<D: Device>(bench: &mut Testbench<D>, line: LineId) -> BenchResult<()> {
    enable_outputs(bench, line.bus, line.mask())?;
    select_pwm(bench, line.bus, line.mask())?;
    info!(%line, "pwm output configured");
    Ok(())
}

/// Writes the duty-cycle register.
pub fn set_duty<D: Device>(bench: &mut Testbench<D>, duty: u8) -> BenchResult<()> {
    write_register(bench, DUTY_REGISTER, duty)?;
    Ok(())
}

/// Register value for a duty cycle in percent, truncated.
pub fn duty_from_percent(percent: u8) -> BenchResult<u8> {
    if percent > 100 {
        return Err(BenchError::InvalidArgument(format!(
            "duty cycle {percent}% out of range (expected 0..=100)"
        )));
    }
    Ok((percent as u32 * 255 / 100) as u8)
}

/// Sets the duty cycle in percent; returns the register value written.
pub fn set_duty_percent<D: Device>(bench: &mut Testbench<D>, percent: u8) -> BenchResult<u8> {
    let duty = duty_from_percent(percent)?;
    set_duty(bench, duty)?;
    Ok(duty)
}

/// Waveform the device produces for a duty register value.
pub fn expected_classification(duty: u8) -> Classification {
    match duty {
        0 => Classification::StaticLow,
        255 => Classification::StaticHigh,
        _ => Classification::Oscillating,
    }
}

fn require<D: Device>(
    bench: &mut Testbench<D>,
    line: LineId,
    expected: Classification,
) -> BenchResult<MeasurementResult> {
    let result = bench.measure_default(line)?;
    if result.classification != expected {
        return Err(BenchError::UnexpectedClassification {
            line: line.to_string(),
            expected,
            actual: result.classification,
        });
    }
    Ok(result)
}

/// Measures `line` and checks it against the configured target frequency.
pub fn verify_frequency<D: Device>(
    bench: &mut Testbench<D>,
    line: LineId,
) -> BenchResult<MeasurementResult> {
    let result = require(bench, line, Classification::Oscillating)?;
    let cfg = bench.config().measurement.clone();
    let hz = tolerance::check_frequency(&result, cfg.target_frequency_hz, cfg.frequency_band())?;
    info!(%line, hz, "frequency within tolerance");
    Ok(result)
}

/// Measures `line` and checks it against the waveform `duty` should give.
///
/// Duty 0 and 255 must measure as static low and static high; any other
/// value must oscillate at the configured frequency with a duty ratio of
/// `duty / denominator`.
pub fn verify_duty<D: Device>(
    bench: &mut Testbench<D>,
    line: LineId,
    duty: u8,
) -> BenchResult<MeasurementResult> {
    let expected = expected_classification(duty);
    let result = require(bench, line, expected)?;
    if expected != Classification::Oscillating {
        let level = bench.line_level(line);
        info!(%line, duty, %level, "static output as expected");
        return Ok(result);
    }

    let cfg = bench.config().measurement.clone();
    tolerance::check_frequency(&result, cfg.target_frequency_hz, cfg.frequency_band())?;
    let ratio = tolerance::check_duty(&result, cfg.expected_duty_ratio(duty), cfg.duty_band())?;
    info!(%line, duty, ratio, "duty within tolerance");
    Ok(result)
}
