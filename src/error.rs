//! Error taxonomy for the testbench.
//!
//! A wait that runs out of budget is a normal outcome (see
//! [`crate::sync::EdgeWait`]) and has no variant here.

use thiserror::Error;

use crate::analyzer::Classification;
use crate::config::ConfigError;
use crate::tolerance::ToleranceViolation;

/// A bus frame that cannot be encoded.
///
/// Detected before any bus line is touched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("address {0} out of range (expected 0..=127)")]
    AddressOutOfRange(i64),

    #[error("payload {0} out of range (expected 0..=255)")]
    PayloadOutOfRange(i64),
}

/// Errors surfaced by testbench operations.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("invalid bus frame: {0}")]
    Validation(#[from] ValidationError),

    #[error("tolerance violation: {0}")]
    Tolerance(#[from] ToleranceViolation),

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("expected {expected:?} waveform on {line}, measured {actual:?}")]
    UnexpectedClassification {
        line: String,
        expected: Classification,
        actual: Classification,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for testbench operations.
pub type BenchResult<T> = Result<T, BenchError>;
