//! Integration tests for the bus transaction encoder.
//!
//! These tests verify:
//! - Frames decoded independently from the bus trace match what was encoded
//! - Validation failures leave the bus and the clock untouched
//! - The PWM peripheral's register behavior over the bus

use buswave::device::{Device, PwmPeripheral};
use buswave::lines::{BusLines, Level, OutputLines};
use buswave::monitor::decode_frames;
use buswave::{BenchConfig, BenchError, BusFrame, Direction, Testbench, ValidationError};

fn bench() -> Testbench<PwmPeripheral> {
    let mut bench = Testbench::new(BenchConfig::default(), PwmPeripheral::new());
    bench.reset();
    bench
}

// ============================================================================
// Round trip through the bus trace
// ============================================================================

#[test]
fn test_encoded_frames_decode_from_trace() {
    let mut bench = bench();
    let mut sent = Vec::new();
    for address in [0u32, 1, 4, 0x2A, 0x55, 0x7F] {
        for payload in [0u8, 1, 0x5A, 0x80, 0xFF] {
            for direction in [Direction::Write, Direction::Read] {
                bench.encode(direction, address, &payload).unwrap();
                sent.push(BusFrame::new(direction, address, &payload).unwrap());
            }
        }
    }
    assert_eq!(bench.trace().frames(), sent);
    assert_eq!(bench.stats().transactions, sent.len() as u64);
}

#[test]
fn test_encoding_is_deterministic() {
    let run = || {
        let mut bench = bench();
        bench.write(0x04, 0x9C).unwrap();
        bench.trace().transitions().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_payload_containers_encode_identically() {
    let mut bench = bench();
    bench.encode(Direction::Write, 4, &0x81u8).unwrap();
    bench.encode(Direction::Write, 4, &0x81u32).unwrap();
    bench.encode(Direction::Write, 4, &0x81i32).unwrap();
    let levels = [
        Level::High,
        Level::Low,
        Level::Low,
        Level::Low,
        Level::Low,
        Level::Low,
        Level::Low,
        Level::High,
    ];
    bench.encode(Direction::Write, 4, &levels).unwrap();

    let frames = decode_frames(bench.trace().transitions());
    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|f| f.payload() == 0x81 && f.address() == 4));
}

#[test]
fn test_bus_stays_within_packed_states() {
    let mut bench = bench();
    bench.write(0x03, 0xA5).unwrap();
    for transition in bench.trace().transitions() {
        assert!(transition.after.to_bits() <= 0b111);
        assert_ne!(transition.before, transition.after);
    }
    assert_eq!(bench.bus_lines().to_bits(), 0b100);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_out_of_range_address_rejected_without_side_effects() {
    let mut bench = bench();
    bench.clear_trace();
    let tick = bench.tick();

    let err = bench.encode(Direction::Write, 200, &0x10u8).unwrap_err();
    assert!(matches!(
        err,
        BenchError::Validation(ValidationError::AddressOutOfRange(200))
    ));
    assert!(bench.trace().is_empty());
    assert_eq!(bench.tick(), tick);
    assert_eq!(bench.bus_lines(), BusLines::IDLE);
}

#[test]
fn test_out_of_range_payload_rejected() {
    let mut bench = bench();
    for payload in [256i32, -1, 1_000] {
        let err = bench.encode(Direction::Write, 4, &payload).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Validation(ValidationError::PayloadOutOfRange(p)) if p == payload as i64
        ));
    }
    assert!(bench.trace().is_empty());
    assert_eq!(bench.stats().frames_rejected, 3);
}

// ============================================================================
// Register behavior
// ============================================================================

#[test]
fn test_register_writes_drive_outputs() {
    let mut bench = bench();

    bench.write(0x00, 0xF0).unwrap();
    assert_eq!(bench.outputs().out, 0xF0);
    bench.wait_ticks(1_000);

    bench.write(0x01, 0xCC).unwrap();
    assert_eq!(bench.outputs().inout, 0xCC);
    bench.wait_ticks(100);

    // Invalid address: accepted on the bus, no effect
    bench.write(0x30, 0xAA).unwrap();
    bench.wait_ticks(100);
    assert_eq!(bench.outputs(), OutputLines::new(0xF0, 0xCC));

    // Reads are no-ops
    bench.encode(Direction::Read, 0x30, &0xBEu8).unwrap();
    assert_eq!(bench.outputs().out, 0xF0);
    bench.encode(Direction::Read, 0x41, &0xEFu8).unwrap();
    bench.encode(Direction::Read, 0x00, &0x00u8).unwrap();
    assert_eq!(bench.outputs().out, 0xF0);

    assert_eq!(bench.device().frames_applied, 2);
    assert_eq!(bench.device().frames_dropped, 4);
}

#[test]
fn test_pwm_select_with_static_duty() {
    let mut bench = bench();
    bench.write(0x00, 0xF0).unwrap();
    bench.write(0x02, 0xFF).unwrap();

    // Duty 0: every PWM-selected bit is low
    assert_eq!(bench.outputs().out, 0x00);

    bench.write(0x04, 0xFF).unwrap();
    bench.wait_ticks(30_000);
    assert_eq!(bench.outputs().out, 0xF0);

    bench.write(0x04, 0x00).unwrap();
    bench.wait_ticks(30_000);
    assert_eq!(bench.outputs().out, 0x00);
}

#[test]
fn test_boxed_device() {
    let device: Box<dyn Device> = Box::new(PwmPeripheral::new());
    let mut bench = Testbench::new(BenchConfig::default(), device);
    bench.reset();
    bench.write(0x01, 0x0F).unwrap();
    assert_eq!(bench.outputs().inout, 0x0F);
    assert_eq!(bench.export_stats()["device"], "pwm_peripheral");
}
