//! Configuration-driven setup and duty sweeps.

use std::io::Write;

use buswave::device::PwmPeripheral;
use buswave::{
    BenchConfig, Classification, ConfigError, DutySweep, LineId, OutputBus, Testbench, TimeUnit,
};

// ============================================================================
// Configuration files
// ============================================================================

fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("buswave-{}-{name}", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_yaml_file() {
    let path = write_temp(
        "bench.yaml",
        r#"
clock:
  period: 50
  unit: ns
bus:
  half_period_ticks: 10
  settle_ticks: 20
measurement:
  timeout_ticks: 5000
log_level: debug
"#,
    );
    let config = BenchConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.clock.period, 50);
    assert_eq!(config.bus.half_period_ticks, 10);
    assert_eq!(config.bus.select_lead_ticks, 1);
    assert_eq!(config.measurement.timeout_ticks, 5_000);
    assert_eq!(config.log_level, "debug");

    let mut bench = Testbench::new(config, PwmPeripheral::new());
    bench.write(0x00, 0x01).unwrap();
    // 1 lead + 16 bits * 20 + 20 settle
    assert_eq!(bench.tick(), 341);
    assert_eq!(bench.now(), 341 * 50);
}

#[test]
fn test_load_json_file() {
    let path = write_temp(
        "bench.json",
        r#"{ "clock": { "period": 1, "unit": "us" }, "measurement": { "duty_denominator": 255 } }"#,
    );
    let config = BenchConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.clock.unit, TimeUnit::Us);
    assert_eq!(config.measurement.duty_denominator, 255);
    assert_eq!(config.measurement.expected_duty_ratio(255), 1.0);
}

#[test]
fn test_invalid_file_rejected() {
    let path = write_temp("bad.yaml", "bus:\n  half_period_ticks: 0\n");
    let err = BenchConfig::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, ConfigError::Validation(_)));

    let err = BenchConfig::from_file("bench.toml").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownFormat(_)));
}

// ============================================================================
// Sweeps
// ============================================================================

#[test]
fn test_standard_sweep_passes() {
    let config = BenchConfig::from_yaml("measurement:\n  timeout_ticks: 8000\n").unwrap();
    let line = LineId::new(OutputBus::InOut, 0);
    let sweep = DutySweep::new(config, line, DutySweep::standard_steps());
    let report = sweep.run(PwmPeripheral::new);

    assert_eq!(report.points.len(), 16);
    assert!(report.all_passed(), "{:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.points[0].classification, Some(Classification::StaticLow));
    assert_eq!(report.points[15].classification, Some(Classification::StaticHigh));
    for point in &report.points[1..15] {
        assert_eq!(point.classification, Some(Classification::Oscillating));
        let hz = point.frequency_hz.unwrap();
        assert!((hz - 3000.0).abs() / 3000.0 <= 0.01, "duty {}: {hz} Hz", point.duty);
    }

    let json = report.to_json();
    assert_eq!(json["points"][1]["duty"], 17);
}
