//! DEIS: Dynamic Electrochemical Impedance Spectroscopy
//!
//! Converts paired voltage/current sample windows into impedance spectra.
//!
//! ## Architecture
//!
//! - **Processing core** (`processing`): validation, spectral transform and
//!   impedance division; pure functions behind `Send + Sync` traits
//! - **Acquisition** (`acquisition`): synthetic or file-backed signal pairs
//!   feeding two bounded queues
//! - **Pipeline** (`pipeline`): consumer loop, output sinks and the direct
//!   circuit-model generator
//! - **Consumer server** (`api`): axum receiver for the emitted wire shapes

pub mod acquisition;
pub mod api;
pub mod config;
pub mod network;
pub mod pipeline;
pub mod processing;
pub mod simulation;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use processing::{DefaultCalculator, ImpedanceCalculator, ProcessingError};
pub use types::{
    ComplexSpectrum, EisMeasurement, ImpedanceBatch, ImpedancePoint, ImpedanceSpectrum,
    RealSignal, SpectrumWithIteration,
};
