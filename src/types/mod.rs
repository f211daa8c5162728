//! Shared data structures for the impedance pipeline
//!
//! - `RealSignal`: paired voltage/current samples from acquisition
//! - `ComplexSpectrum`: transform output (full or half spectrum)
//! - `ImpedanceSpectrum`: Z(f) = U(f)/I(f) with magnitude and phase
//! - Export shapes (`EisMeasurement`, `ImpedancePoint`, `ImpedanceBatch`)

mod measurement;
mod signal;
pub mod wire;

pub use measurement::*;
pub use signal::*;
