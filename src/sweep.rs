//! Duty-cycle sweeps across independent testbenches.
//!
//! Each sweep point gets its own [`Testbench`] and device, so points share
//! no simulated state and can run on separate threads.
//!
//! # Feature Flag
//!
//! Points run on a rayon pool with the `parallel` feature:
//! ```toml
//! [dependencies]
//! buswave = { version = "0.1", features = ["parallel"] }
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::Classification;
use crate::bench::Testbench;
use crate::config::BenchConfig;
use crate::device::Device;
use crate::error::BenchResult;
use crate::lines::LineId;
use crate::scenario;

/// Outcome of one duty value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepPoint {
    pub duty: u8,
    /// Absent if the point failed before a measurement was taken
    pub classification: Option<Classification>,
    pub duty_ratio: Option<f64>,
    pub frequency_hz: Option<f64>,
    /// Ticks the point took, reset included
    pub ticks: u64,
    /// Failure message, if any check failed
    pub error: Option<String>,
}

impl SweepPoint {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of a sweep, ordered by duty value.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SweepReport {
    pub line: Option<LineId>,
    pub points: Vec<SweepPoint>,
    /// Wall-clock duration of the whole sweep
    pub elapsed_ms: f64,
}

impl SweepReport {
    pub fn all_passed(&self) -> bool {
        self.points.iter().all(SweepPoint::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &SweepPoint> {
        self.points.iter().filter(|p| !p.passed())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self)
    }
}

/// Runs reset, configure, set duty and verify for a list of duty values.
#[derive(Clone, Debug)]
pub struct DutySweep {
    config: BenchConfig,
    line: LineId,
    duties: Vec<u8>,
    /// Number of worker threads (0 = rayon default)
    num_threads: usize,
}

impl DutySweep {
    pub fn new(config: BenchConfig, line: LineId, duties: Vec<u8>) -> Self {
        Self {
            config,
            line,
            duties,
            num_threads: 0,
        }
    }

    /// Duty values 0, 17, 34, ..., 255.
    pub fn standard_steps() -> Vec<u8> {
        (0..=255u8).step_by(17).collect()
    }

    /// Sets the number of worker threads used with the `parallel` feature.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    pub fn duties(&self) -> &[u8] {
        &self.duties
    }

    /// Runs every point on a fresh device built by `factory`.
    pub fn run<D, F>(&self, factory: F) -> SweepReport
    where
        D: Device,
        F: Fn() -> D + Sync,
    {
        let start = std::time::Instant::now();
        let results = Mutex::new(Vec::with_capacity(self.duties.len()));
        self.for_each_duty(|duty| {
            let point = self.run_point(duty, factory());
            results.lock().push(point);
        });

        let mut points = results.into_inner();
        points.sort_by_key(|p| p.duty);
        let report = SweepReport {
            line: Some(self.line),
            points,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            line = %self.line,
            points = report.points.len(),
            failures = report.failures().count(),
            elapsed_ms = report.elapsed_ms,
            "duty sweep complete"
        );
        report
    }

    #[cfg(not(feature = "parallel"))]
    fn for_each_duty<G: Fn(u8) + Sync>(&self, visit: G) {
        self.duties.iter().copied().for_each(visit);
    }

    #[cfg(feature = "parallel")]
    fn for_each_duty<G: Fn(u8) + Sync + Send>(&self, visit: G) {
        if self.num_threads == 0 {
            self.duties.par_iter().copied().for_each(visit);
            return;
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
        {
            Ok(pool) => pool.install(|| self.duties.par_iter().copied().for_each(visit)),
            Err(err) => {
                warn!(%err, "could not build sweep thread pool; using the global pool");
                self.duties.par_iter().copied().for_each(visit);
            }
        }
    }

    fn run_point<D: Device>(&self, duty: u8, device: D) -> SweepPoint {
        let mut bench = Testbench::new(self.config.clone(), device);
        let outcome = Self::check_point(&mut bench, self.line, duty);
        let (classification, duty_ratio, frequency_hz, error) = match outcome {
            Ok(result) => (
                Some(result.classification),
                result.duty_ratio(),
                result.frequency_hz(),
                None,
            ),
            Err(err) => {
                warn!(duty, %err, "sweep point failed");
                (None, None, None, Some(err.to_string()))
            }
        };
        SweepPoint {
            duty,
            classification,
            duty_ratio,
            frequency_hz,
            ticks: bench.tick(),
            error,
        }
    }

    fn check_point<D: Device>(
        bench: &mut Testbench<D>,
        line: LineId,
        duty: u8,
    ) -> BenchResult<crate::analyzer::MeasurementResult> {
        bench.reset();
        scenario::configure_pwm_output(bench, line)?;
        scenario::set_duty(bench, duty)?;
        scenario::verify_duty(bench, line, duty)
    }
}
