//! Runs the PWM peripheral checks end to end against the behavioral model.
//!
//! Run with: `cargo run --example pwm_check [config.yaml]`
//! Set `RUST_LOG=buswave=debug` to see every bus transaction.

use buswave::device::PwmPeripheral;
use buswave::scenario::{
    configure_pwm_output, set_duty, set_duty_percent, verify_duty, verify_frequency,
    write_register,
};
use buswave::tolerance::{self, ToleranceBand};
use buswave::{BenchConfig, BenchResult, DutySweep, LineId, OutputBus, Testbench};
use tracing::info;

fn bench(config: &BenchConfig) -> Testbench<PwmPeripheral> {
    let mut bench = Testbench::new(config.clone(), PwmPeripheral::new());
    bench.reset();
    bench
}

/// Register writes, invalid addresses and reads.
fn check_bus(config: &BenchConfig) -> BenchResult<()> {
    let mut bench = bench(config);

    write_register(&mut bench, 0x00, 0xF0)?;
    info!(uo_out = format!("{:#04x}", bench.outputs().out), "after enabling uo_out[7:4]");
    write_register(&mut bench, 0x01, 0xCC)?;
    info!(uio_out = format!("{:#04x}", bench.outputs().inout), "after enabling uio_out");
    write_register(&mut bench, 0x30, 0xAA)?;
    bench.encode(buswave::Direction::Read, 0x30, &0xBEu8)?;
    info!(uo_out = format!("{:#04x}", bench.outputs().out), "after ignored frames");

    if let Err(err) = bench.write(200, 0x10) {
        info!(%err, "out-of-range address rejected");
    }
    info!(stats = %bench.export_stats(), "bus check done");
    Ok(())
}

/// Output frequency at 50 % duty.
fn check_frequency(config: &BenchConfig, line: LineId) -> BenchResult<()> {
    let mut bench = bench(config);
    configure_pwm_output(&mut bench, line)?;
    set_duty(&mut bench, 0x80)?;
    bench.wait_ticks(1_000);

    let result = verify_frequency(&mut bench, line)?;
    tolerance::check_period(&result, 333_333.0, ToleranceBand::Relative(0.02))?;
    tolerance::check_high_time(&result, 166_667.0, ToleranceBand::Relative(0.02))?;
    info!(%result, "frequency check done");
    Ok(())
}

/// Duty cycles given in percent.
fn check_duty(config: &BenchConfig, line: LineId) -> BenchResult<()> {
    let mut bench = bench(config);
    configure_pwm_output(&mut bench, line)?;
    for percent in [0, 1, 25, 50, 75, 99, 100] {
        let duty = set_duty_percent(&mut bench, percent)?;
        let result = verify_duty(&mut bench, line, duty)?;
        info!(percent, %result, "duty check");
    }
    Ok(())
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match BenchConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("failed to load {path}: {err}");
                std::process::exit(2);
            }
        },
        None => BenchConfig::default(),
    };
    buswave::init_logging(&config.log_level);

    let line = LineId::new(OutputBus::InOut, 0);
    let results = [
        ("bus", check_bus(&config)),
        ("frequency", check_frequency(&config, line)),
        ("duty", check_duty(&config, line)),
    ];

    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(()) => info!(check = name, "passed"),
            Err(err) => {
                tracing::error!(check = name, %err, "failed");
                failed += 1;
            }
        }
    }

    let report = DutySweep::new(config.clone(), line, DutySweep::standard_steps())
        .run(PwmPeripheral::new);
    info!(
        passed = report.all_passed(),
        elapsed_ms = report.elapsed_ms,
        "duty sweep"
    );
    if !report.all_passed() {
        failed += 1;
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
