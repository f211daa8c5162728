//! Equivalent-circuit spectrum synthesis
//!
//! Produces impedance spectra directly from a circuit model, bypassing the
//! time-domain transform path entirely.

mod circuit;

pub use circuit::{
    circuit_impedance, log_frequencies, CircuitModelGenerator, CircuitParameters, CircuitPreset,
};
