//! Configuration system for the testbench.
//!
//! Timing of the clock, the bus protocol and the measurement policy can be
//! loaded from YAML or JSON. Every field has a default matching the device's
//! documented contract, so an empty file is a valid configuration.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! clock:
//!   period: 100
//!   unit: ns
//!
//! bus:
//!   select_lead_ticks: 1
//!   half_period_ticks: 50
//!   settle_ticks: 600
//!
//! measurement:
//!   timeout_ticks: 1000000
//!   target_frequency_hz: 3000.0
//!   frequency_tolerance: 0.01
//!   duty_tolerance: 0.01
//!   duty_denominator: 256
//!
//! log_level: info
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::clock::{SimClock, TimeUnit};
use crate::tolerance::{duty_ratio, ToleranceBand};
use crate::types::{SimTime, TickCount};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Clock source parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Tick period in `unit`
    #[serde(default = "default_clock_period")]
    pub period: SimTime,

    /// Base unit of all simulated time
    #[serde(default)]
    pub unit: TimeUnit,
}

fn default_clock_period() -> SimTime {
    100
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: default_clock_period(),
            unit: TimeUnit::Ns,
        }
    }
}

impl ClockConfig {
    /// Builds a fresh clock at tick 0.
    pub fn build(&self) -> SimClock {
        SimClock::new(self.period, self.unit)
    }
}

/// Timing of one bus transaction, in ticks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusTiming {
    /// Ticks between asserting select and driving the first bit
    #[serde(default = "default_select_lead")]
    pub select_lead_ticks: TickCount,

    /// Ticks the bus clock stays low, then high, for each bit
    #[serde(default = "default_half_period")]
    pub half_period_ticks: TickCount,

    /// Ticks after deasserting select before the bus may be reused
    #[serde(default = "default_settle")]
    pub settle_ticks: TickCount,
}

fn default_select_lead() -> TickCount {
    1
}

fn default_half_period() -> TickCount {
    50
}

fn default_settle() -> TickCount {
    600
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            select_lead_ticks: default_select_lead(),
            half_period_ticks: default_half_period(),
            settle_ticks: default_settle(),
        }
    }
}

impl BusTiming {
    /// Total ticks consumed by one transaction, settle included.
    pub fn transaction_ticks(&self) -> TickCount {
        self.select_lead_ticks
            + 2 * self.half_period_ticks * crate::frame::FRAME_BITS as TickCount
            + self.settle_ticks
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.half_period_ticks == 0 {
            return Err(ConfigError::Validation(
                "bus half_period_ticks must be at least 1".to_string(),
            ));
        }
        if self.select_lead_ticks == 0 {
            return Err(ConfigError::Validation(
                "bus select_lead_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Measurement and acceptance policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Budget for each individual wait of the synchronizer
    #[serde(default = "default_timeout")]
    pub timeout_ticks: TickCount,

    /// Expected output frequency for non-degenerate duty values
    #[serde(default = "default_target_frequency")]
    pub target_frequency_hz: f64,

    /// Relative frequency tolerance (0.01 = ±1 %)
    #[serde(default = "default_tolerance")]
    pub frequency_tolerance: f64,

    /// Absolute duty-ratio tolerance (0.01 = ±1 percentage point)
    #[serde(default = "default_tolerance")]
    pub duty_tolerance: f64,

    /// Denominator turning a duty register value into a ratio
    #[serde(default = "default_duty_denominator")]
    pub duty_denominator: u32,
}

fn default_timeout() -> TickCount {
    1_000_000
}

fn default_target_frequency() -> f64 {
    3000.0
}

fn default_tolerance() -> f64 {
    0.01
}

fn default_duty_denominator() -> u32 {
    256
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            timeout_ticks: default_timeout(),
            target_frequency_hz: default_target_frequency(),
            frequency_tolerance: default_tolerance(),
            duty_tolerance: default_tolerance(),
            duty_denominator: default_duty_denominator(),
        }
    }
}

impl MeasurementConfig {
    /// Acceptance band for the output frequency.
    pub fn frequency_band(&self) -> ToleranceBand {
        ToleranceBand::Relative(self.frequency_tolerance)
    }

    /// Acceptance band for the duty ratio.
    pub fn duty_band(&self) -> ToleranceBand {
        ToleranceBand::Absolute(self.duty_tolerance)
    }

    /// Duty ratio expected for a register value.
    pub fn expected_duty_ratio(&self, duty: u8) -> f64 {
        duty_ratio(duty, self.duty_denominator)
    }

    fn validate(&self) -> ConfigResult<()> {
        if !(self.target_frequency_hz > 0.0) {
            return Err(ConfigError::Validation(format!(
                "target_frequency_hz must be positive, got {}",
                self.target_frequency_hz
            )));
        }
        for (name, value) in [
            ("frequency_tolerance", self.frequency_tolerance),
            ("duty_tolerance", self.duty_tolerance),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
        }
        if self.duty_denominator != 255 && self.duty_denominator != 256 {
            return Err(ConfigError::Validation(format!(
                "duty_denominator must be 255 or 256, got {}",
                self.duty_denominator
            )));
        }
        if self.timeout_ticks == 0 {
            tracing::warn!("timeout_ticks is 0; every wait only checks the current level");
        }
        Ok(())
    }
}

/// Complete testbench configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub bus: BusTiming,

    #[serde(default)]
    pub measurement: MeasurementConfig,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            bus: BusTiming::default(),
            measurement: MeasurementConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl BenchConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: BenchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: BenchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.clock.period == 0 {
            return Err(ConfigError::Validation(
                "clock period must be positive".to_string(),
            ));
        }
        self.bus.validate()?;
        self.measurement.validate()?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating BenchConfig programmatically.
#[derive(Default)]
pub struct BenchConfigBuilder {
    config: BenchConfig,
}

impl BenchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BenchConfig::new(),
        }
    }

    /// Sets the clock period and unit.
    pub fn clock(mut self, period: SimTime, unit: TimeUnit) -> Self {
        self.config.clock = ClockConfig { period, unit };
        self
    }

    /// Sets the bus clock half period in ticks.
    pub fn half_period_ticks(mut self, ticks: TickCount) -> Self {
        self.config.bus.half_period_ticks = ticks;
        self
    }

    /// Sets the post-transaction settle delay in ticks.
    pub fn settle_ticks(mut self, ticks: TickCount) -> Self {
        self.config.bus.settle_ticks = ticks;
        self
    }

    /// Sets the per-wait timeout budget.
    pub fn timeout_ticks(mut self, ticks: TickCount) -> Self {
        self.config.measurement.timeout_ticks = ticks;
        self
    }

    /// Sets the expected output frequency.
    pub fn target_frequency_hz(mut self, hz: f64) -> Self {
        self.config.measurement.target_frequency_hz = hz;
        self
    }

    /// Sets the frequency and duty tolerances.
    pub fn tolerances(mut self, frequency: f64, duty: f64) -> Self {
        self.config.measurement.frequency_tolerance = frequency;
        self.config.measurement.duty_tolerance = duty;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<BenchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
