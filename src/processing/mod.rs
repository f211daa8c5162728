//! Signal processing core - validation, spectral transform, impedance
//!
//! Every component here is a pure function of its inputs: no caches, no
//! counters, no shared mutable state. Implementations are plain structs
//! behind `Send + Sync` traits, so one instance can serve concurrent callers.
//!
//! ```text
//! RealSignal ─► validate ─► transform ─► half spectrum ─┐
//! RealSignal ─► validate ─► transform ─► half spectrum ─┴─► U/I ─► ImpedanceSpectrum
//! ```

mod fft;
mod impedance;
mod validator;

pub use fft::{bin_frequencies, MixedRadixFft, SpectralTransform};
pub use impedance::{
    DefaultCalculator, ImpedanceCalculator, MAX_TIMESTAMP_DRIFT_MS, NEAR_ZERO_CURRENT,
};
pub use validator::{DefaultValidator, SignalValidator};

use thiserror::Error;

/// Errors raised by the processing core.
///
/// Every variant names what was wrong and where; the core never converts
/// one of these into a default value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Invalid length for {field}: {reason}")]
    InvalidLength { field: &'static str, reason: String },

    #[error("Invalid sample rate: {0} (must be > 0)")]
    InvalidSampleRate(f64),

    #[error("Invalid timestamp for {field}: zero/epoch sentinel")]
    InvalidTimestamp { field: &'static str },

    #[error("Non-finite value in {field} at index {index}")]
    NonFiniteValue { field: &'static str, index: usize },

    #[error("Negative frequency {frequency} Hz at index {index}")]
    NegativeFrequency { index: usize, frequency: f64 },

    #[error("Mismatched length: voltage has {voltage} values, current has {current}")]
    MismatchedLength { voltage: usize, current: usize },

    #[error("Mismatched sample rate: voltage {voltage} Hz, current {current} Hz")]
    MismatchedSampleRate { voltage: f64, current: f64 },

    #[error("Timestamp drift of {drift_us} µs between voltage and current exceeds {limit_ms} ms")]
    TimestampDrift { drift_us: i64, limit_ms: i64 },

    #[error("Invalid impedance value at frequency index {index}")]
    InvalidImpedanceValue { index: usize },

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl ProcessingError {
    pub(crate) fn empty(field: &'static str) -> Self {
        Self::InvalidLength {
            field,
            reason: "sequence cannot be empty".to_string(),
        }
    }

    pub(crate) fn length_mismatch(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::InvalidLength {
            field,
            reason: format!("expected {expected} entries, found {actual}"),
        }
    }
}
