//! Performance benchmarks for the buswave testbench.
//!
//! Run with: `cargo bench`
//! Or for specific bench: `cargo bench --bench testbench_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use buswave::device::{PwmPeripheral, WaveformDevice};
use buswave::scenario::{configure_pwm_output, set_duty};
use buswave::{BenchConfig, DutySweep, Level, LineId, OutputBus, Testbench};

fn line() -> LineId {
    LineId::new(OutputBus::InOut, 0)
}

// ============================================================================
// Tick Loop Benchmarks
// ============================================================================

fn bench_tick_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_throughput");

    for ticks in [1_000u64, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*ticks));
        group.bench_with_input(BenchmarkId::new("ticks", ticks), ticks, |b, &ticks| {
            b.iter(|| {
                let mut bench = Testbench::new(BenchConfig::default(), PwmPeripheral::new());
                bench.wait_ticks(ticks);
                black_box(bench.tick())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Encoder Benchmarks
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoder");

    for frames in [1u64, 10, 50].iter() {
        group.throughput(Throughput::Elements(*frames));
        group.bench_with_input(BenchmarkId::new("frames", frames), frames, |b, &frames| {
            b.iter(|| {
                let mut bench = Testbench::new(BenchConfig::default(), PwmPeripheral::new());
                for i in 0..frames {
                    bench.write((i % 5) as u32, i as u8).ok();
                }
                black_box(bench.trace().len())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Measurement Benchmarks
// ============================================================================

fn bench_measure(c: &mut Criterion) {
    let mut group = c.benchmark_group("measure");

    for duty in [17u8, 128, 238].iter() {
        group.bench_with_input(BenchmarkId::new("duty", duty), duty, |b, &duty| {
            let mut bench = Testbench::new(BenchConfig::default(), PwmPeripheral::new());
            bench.reset();
            configure_pwm_output(&mut bench, line()).ok();
            set_duty(&mut bench, duty).ok();
            b.iter(|| black_box(bench.measure(line(), 10_000).ok()));
        });
    }

    group.bench_function("static_timeout", |b| {
        b.iter(|| {
            let device = WaveformDevice::constant(line(), Level::Low);
            let mut bench = Testbench::new(BenchConfig::default(), device);
            black_box(bench.measure(line(), 100_000).ok())
        });
    });

    group.finish();
}

// ============================================================================
// Sweep Benchmarks
// ============================================================================

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    group.sample_size(10);

    let config = BenchConfig::from_yaml("measurement:\n  timeout_ticks: 8000\n")
        .unwrap_or_default();
    let sweep = DutySweep::new(config, line(), DutySweep::standard_steps());

    group.bench_function("standard_steps", |b| {
        b.iter(|| black_box(sweep.run(PwmPeripheral::new).all_passed()));
    });

    group.finish();
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(
    benches,
    bench_tick_throughput,
    bench_encode,
    bench_measure,
    bench_sweep,
);

criterion_main!(benches);
