//! Impedance calculator: Z(f) = U(f) / I(f)
//!
//! Both signals go through the transform engine, are cut to their half
//! spectra, and are divided bin by bin. Bins where the current spectrum is
//! effectively zero are defined as `0+0i` rather than divided.

use chrono::TimeDelta;
use num_complex::Complex64;
use std::sync::Arc;

use super::{DefaultValidator, MixedRadixFft, ProcessingError, SignalValidator, SpectralTransform};
use crate::types::{ComplexSpectrum, EisMeasurement, ImpedanceSpectrum, RealSignal};

/// Current magnitudes below this produce `Z = 0+0i` for that bin.
pub const NEAR_ZERO_CURRENT: f64 = 1e-10;

/// Maximum allowed gap between voltage and current timestamps.
pub const MAX_TIMESTAMP_DRIFT_MS: i64 = 100;

/// Impedance computation capability used by the pipeline orchestrator.
pub trait ImpedanceCalculator: Send + Sync {
    /// Validate each signal, then check that the pair is compatible.
    fn validate_pair(&self, voltage: &RealSignal, current: &RealSignal)
        -> Result<(), ProcessingError>;

    /// Complex impedance, magnitude and phase for one voltage/current pair.
    fn compute_impedance(
        &self,
        voltage: &RealSignal,
        current: &RealSignal,
    ) -> Result<ImpedanceSpectrum, ProcessingError>;

    /// Impedance plus the two half spectra it was computed from.
    fn process_measurement(
        &self,
        voltage: &RealSignal,
        current: &RealSignal,
    ) -> Result<EisMeasurement, ProcessingError>;
}

/// Calculator composed from an injected validator and transform engine.
#[derive(Clone)]
pub struct DefaultCalculator {
    validator: Arc<dyn SignalValidator>,
    transform: Arc<dyn SpectralTransform>,
}

impl DefaultCalculator {
    pub fn new(validator: Arc<dyn SignalValidator>, transform: Arc<dyn SpectralTransform>) -> Self {
        Self {
            validator,
            transform,
        }
    }

    /// Half spectrum of one signal.
    fn half_spectrum(&self, signal: &RealSignal) -> Result<ComplexSpectrum, ProcessingError> {
        let full = self.transform.transform(signal)?;
        self.transform.extract_half_spectrum(&full)
    }

    /// Shared body of `compute_impedance` / `process_measurement`.
    fn run(
        &self,
        voltage: &RealSignal,
        current: &RealSignal,
    ) -> Result<EisMeasurement, ProcessingError> {
        self.validate_pair(voltage, current)?;

        let voltage_half = self.half_spectrum(voltage)?;
        let current_half = self.half_spectrum(current)?;

        if voltage_half.values.len() != current_half.values.len() {
            return Err(ProcessingError::MismatchedLength {
                voltage: voltage_half.values.len(),
                current: current_half.values.len(),
            });
        }

        let impedance = divide_spectra(&voltage_half.values, &current_half.values)?;
        let spectrum = ImpedanceSpectrum::from_impedance(
            voltage.timestamp,
            impedance,
            voltage_half.frequencies.clone(),
        );
        self.validator.validate_impedance(&spectrum)?;

        tracing::debug!(
            bins = spectrum.len(),
            sample_rate = voltage.sample_rate,
            "Impedance spectrum computed"
        );

        Ok(EisMeasurement {
            voltage: voltage_half,
            current: current_half,
            impedance: spectrum,
        })
    }
}

impl Default for DefaultCalculator {
    fn default() -> Self {
        let validator: Arc<dyn SignalValidator> = Arc::new(DefaultValidator::new());
        let transform = Arc::new(MixedRadixFft::new(Arc::clone(&validator)));
        Self::new(validator, transform)
    }
}

impl std::fmt::Debug for DefaultCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultCalculator").finish_non_exhaustive()
    }
}

impl ImpedanceCalculator for DefaultCalculator {
    fn validate_pair(
        &self,
        voltage: &RealSignal,
        current: &RealSignal,
    ) -> Result<(), ProcessingError> {
        self.validator.validate_real(voltage)?;
        self.validator.validate_real(current)?;

        if voltage.values.len() != current.values.len() {
            return Err(ProcessingError::MismatchedLength {
                voltage: voltage.values.len(),
                current: current.values.len(),
            });
        }

        #[allow(clippy::float_cmp)]
        if voltage.sample_rate != current.sample_rate {
            return Err(ProcessingError::MismatchedSampleRate {
                voltage: voltage.sample_rate,
                current: current.sample_rate,
            });
        }

        let drift = voltage.timestamp - current.timestamp;
        let drift = if drift < TimeDelta::zero() { -drift } else { drift };
        if drift > TimeDelta::milliseconds(MAX_TIMESTAMP_DRIFT_MS) {
            return Err(ProcessingError::TimestampDrift {
                drift_us: drift.num_microseconds().unwrap_or(i64::MAX),
                limit_ms: MAX_TIMESTAMP_DRIFT_MS,
            });
        }
        Ok(())
    }

    fn compute_impedance(
        &self,
        voltage: &RealSignal,
        current: &RealSignal,
    ) -> Result<ImpedanceSpectrum, ProcessingError> {
        self.run(voltage, current).map(|m| m.impedance)
    }

    fn process_measurement(
        &self,
        voltage: &RealSignal,
        current: &RealSignal,
    ) -> Result<EisMeasurement, ProcessingError> {
        self.run(voltage, current)
    }
}

/// Element-wise `U / I` with the near-zero-current guard.
fn divide_spectra(
    voltage: &[Complex64],
    current: &[Complex64],
) -> Result<Vec<Complex64>, ProcessingError> {
    voltage
        .iter()
        .zip(current.iter())
        .enumerate()
        .map(|(index, (u, i))| {
            if i.norm() < NEAR_ZERO_CURRENT {
                return Ok(Complex64::new(0.0, 0.0));
            }
            let z = u / i;
            if !z.re.is_finite() || !z.im.is_finite() {
                return Err(ProcessingError::InvalidImpedanceValue { index });
            }
            Ok(z)
        })
        .collect()
}
