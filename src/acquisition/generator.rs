//! Synthetic voltage/current excitation
//!
//! The voltage is a DC offset plus eight sine components; the current is the
//! response of a simplified R(RC) cell to that excitation, with
//! frequency-dependent attenuation and lag. Both carry a little uniform noise.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::processing::ProcessingError;
use crate::types::RealSignal;

/// Excitation frequencies (Hz).
pub const EXCITATION_FREQUENCIES: [f64; 8] = [1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0];

/// Voltage amplitude of each excitation component (V).
pub const EXCITATION_AMPLITUDES: [f64; 8] = [0.2, 0.15, 0.12, 0.1, 0.08, 0.06, 0.04, 0.02];

const VOLTAGE_DC: f64 = 1.0;
const VOLTAGE_NOISE: f64 = 0.01;
const CURRENT_DC: f64 = 0.05;
const CURRENT_NOISE: f64 = 0.005;

/// Source of synthetic time-domain signals.
pub trait SignalGenerator: Send {
    fn generate_voltage(
        &mut self,
        sample_rate: f64,
        samples: usize,
    ) -> Result<RealSignal, ProcessingError>;

    fn generate_current(
        &mut self,
        sample_rate: f64,
        samples: usize,
    ) -> Result<RealSignal, ProcessingError>;
}

/// Cell model used for the current response: `|Z| = 10 + 20/(1 + f/10)` Ω.
pub fn model_impedance_magnitude(frequency: f64) -> f64 {
    10.0 + 20.0 / (1.0 + frequency / 10.0)
}

/// Current lag (radians) of the cell model: `0.5·atan(f/50)`.
pub fn model_phase_shift(frequency: f64) -> f64 {
    0.5 * (frequency / 50.0).atan()
}

/// Multi-sine generator with uniform measurement noise.
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible noise sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Voltage and current stamped with the same instant.
    pub fn generate_pair(
        &mut self,
        sample_rate: f64,
        samples: usize,
    ) -> Result<(RealSignal, RealSignal), ProcessingError> {
        check_request(sample_rate, samples)?;
        let now = Utc::now();
        Ok((
            self.voltage_at(now, sample_rate, samples),
            self.current_at(now, sample_rate, samples),
        ))
    }

    fn noise(&mut self, amplitude: f64) -> f64 {
        amplitude * (self.rng.gen::<f64>() - 0.5)
    }

    fn voltage_at(&mut self, timestamp: DateTime<Utc>, sample_rate: f64, samples: usize) -> RealSignal {
        let values = (0..samples)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let excitation: f64 = EXCITATION_FREQUENCIES
                    .iter()
                    .zip(EXCITATION_AMPLITUDES.iter())
                    .map(|(&f, &a)| a * (2.0 * PI * f * t).sin())
                    .sum();
                VOLTAGE_DC + excitation + self.noise(VOLTAGE_NOISE)
            })
            .collect();
        RealSignal::new(timestamp, values, sample_rate)
    }

    fn current_at(&mut self, timestamp: DateTime<Utc>, sample_rate: f64, samples: usize) -> RealSignal {
        let values = (0..samples)
            .map(|i| {
                let t = i as f64 / sample_rate;
                let response: f64 = EXCITATION_FREQUENCIES
                    .iter()
                    .zip(EXCITATION_AMPLITUDES.iter())
                    .map(|(&f, &a)| {
                        let amplitude = a / model_impedance_magnitude(f);
                        amplitude * (2.0 * PI * f * t - model_phase_shift(f)).sin()
                    })
                    .sum();
                CURRENT_DC + response + self.noise(CURRENT_NOISE)
            })
            .collect();
        RealSignal::new(timestamp, values, sample_rate)
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalGenerator for SyntheticGenerator {
    fn generate_voltage(
        &mut self,
        sample_rate: f64,
        samples: usize,
    ) -> Result<RealSignal, ProcessingError> {
        check_request(sample_rate, samples)?;
        Ok(self.voltage_at(Utc::now(), sample_rate, samples))
    }

    fn generate_current(
        &mut self,
        sample_rate: f64,
        samples: usize,
    ) -> Result<RealSignal, ProcessingError> {
        check_request(sample_rate, samples)?;
        Ok(self.current_at(Utc::now(), sample_rate, samples))
    }
}

fn check_request(sample_rate: f64, samples: usize) -> Result<(), ProcessingError> {
    if !(sample_rate > 0.0) || sample_rate.is_infinite() {
        return Err(ProcessingError::InvalidSampleRate(sample_rate));
    }
    if samples == 0 {
        return Err(ProcessingError::InvalidLength {
            field: "samples",
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{DefaultValidator, SignalValidator};

    #[test]
    fn test_rejects_bad_requests() {
        let mut g = SyntheticGenerator::with_seed(1);
        assert_eq!(
            g.generate_voltage(0.0, 10),
            Err(ProcessingError::InvalidSampleRate(0.0))
        );
        assert!(matches!(
            g.generate_current(1000.0, 0),
            Err(ProcessingError::InvalidLength { field: "samples", .. })
        ));
        assert!(g.generate_pair(-1.0, 10).is_err());
    }

    #[test]
    fn test_generated_signals_are_valid() {
        let mut g = SyntheticGenerator::with_seed(7);
        let v = g.generate_voltage(1000.0, 1000).unwrap();
        let i = g.generate_current(1000.0, 1000).unwrap();
        let validator = DefaultValidator::new();
        assert!(validator.validate_real(&v).is_ok());
        assert!(validator.validate_real(&i).is_ok());
        assert_eq!(v.len(), 1000);
        assert_eq!(i.sample_rate, 1000.0);
    }

    #[test]
    fn test_first_sample_is_dc_plus_noise() {
        // At t = 0 every sine term vanishes
        let mut g = SyntheticGenerator::with_seed(3);
        let (v, i) = g.generate_pair(1000.0, 4).unwrap();
        assert!((v.values[0] - VOLTAGE_DC).abs() <= VOLTAGE_NOISE / 2.0);

        let lag: f64 = EXCITATION_FREQUENCIES
            .iter()
            .zip(EXCITATION_AMPLITUDES.iter())
            .map(|(&f, &a)| -a / model_impedance_magnitude(f) * model_phase_shift(f).sin())
            .sum();
        assert!((i.values[0] - (CURRENT_DC + lag)).abs() <= CURRENT_NOISE / 2.0);
    }

    #[test]
    fn test_pair_shares_timestamp() {
        let mut g = SyntheticGenerator::with_seed(11);
        let (v, i) = g.generate_pair(500.0, 100).unwrap();
        assert_eq!(v.timestamp, i.timestamp);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = SyntheticGenerator::with_seed(42);
        let mut b = SyntheticGenerator::with_seed(42);
        let va = a.generate_voltage(100.0, 50).unwrap();
        let vb = b.generate_voltage(100.0, 50).unwrap();
        assert_eq!(va.values, vb.values);
    }

    #[test]
    fn test_cell_model() {
        assert!((model_impedance_magnitude(0.0) - 30.0).abs() < 1e-12);
        assert!((model_impedance_magnitude(10.0) - 20.0).abs() < 1e-12);
        assert!((model_phase_shift(50.0) - 0.5 * std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }
}
