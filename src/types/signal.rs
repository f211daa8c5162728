//! Time- and frequency-domain signal types
//!
//! All three are transient per-cycle artifacts: built once, never mutated
//! after construction, and handed to the caller by value.

use chrono::{DateTime, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::measurement::ImpedancePoint;
use super::wire::{complex_pairs, rfc3339_nanos};

/// Time-domain samples (insertion order = time order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealSignal {
    #[serde(with = "rfc3339_nanos")]
    pub timestamp: DateTime<Utc>,
    pub values: Vec<f64>,
    /// Sampling rate (Hz)
    pub sample_rate: f64,
}

impl RealSignal {
    pub fn new(timestamp: DateTime<Utc>, values: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            timestamp,
            values,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Signal duration in seconds (0 when the rate or the samples are unusable).
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate <= 0.0 || self.values.is_empty() {
            return 0.0;
        }
        self.values.len() as f64 / self.sample_rate
    }
}

/// Frequency-domain values with one frequency bin (Hz) per value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexSpectrum {
    #[serde(with = "rfc3339_nanos")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "complex_pairs")]
    pub values: Vec<Complex64>,
    pub frequencies: Vec<f64>,
}

impl ComplexSpectrum {
    pub fn new(timestamp: DateTime<Utc>, values: Vec<Complex64>, frequencies: Vec<f64>) -> Self {
        Self {
            timestamp,
            values,
            frequencies,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Complex impedance per frequency bin, plus derived magnitude and phase.
///
/// `magnitude` and `phase` are either empty or exactly as long as `impedance`;
/// when present, `magnitude[i] == |impedance[i]|` and
/// `phase[i] == atan2(Im, Re)` in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpedanceSpectrum {
    #[serde(with = "rfc3339_nanos")]
    pub timestamp: DateTime<Utc>,
    #[serde(with = "complex_pairs")]
    pub impedance: Vec<Complex64>,
    pub frequencies: Vec<f64>,
    #[serde(default)]
    pub magnitude: Vec<f64>,
    #[serde(default)]
    pub phase: Vec<f64>,
}

impl ImpedanceSpectrum {
    /// Build a spectrum and derive magnitude/phase from the impedance values.
    pub fn from_impedance(
        timestamp: DateTime<Utc>,
        impedance: Vec<Complex64>,
        frequencies: Vec<f64>,
    ) -> Self {
        let (magnitude, phase) = magnitude_phase(&impedance);
        Self {
            timestamp,
            impedance,
            frequencies,
            magnitude,
            phase,
        }
    }

    pub fn len(&self) -> usize {
        self.impedance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impedance.is_empty()
    }

    /// Recompute `(magnitude, phase)` from the stored impedance values.
    pub fn recompute_magnitude_phase(&self) -> (Vec<f64>, Vec<f64>) {
        magnitude_phase(&self.impedance)
    }

    /// Index-aligned `(frequency, real, imag)` triples.
    pub fn to_points(&self) -> Vec<ImpedancePoint> {
        self.impedance
            .iter()
            .zip(self.frequencies.iter())
            .map(|(z, &frequency)| ImpedancePoint {
                frequency,
                real: z.re,
                imag: z.im,
            })
            .collect()
    }
}

/// `|z|` and `atan2(Im z, Re z)` for every value.
pub fn magnitude_phase(values: &[Complex64]) -> (Vec<f64>, Vec<f64>) {
    values.iter().map(|z| (z.norm(), z.im.atan2(z.re))).unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn duration_follows_rate() {
        let signal = RealSignal::new(Utc::now(), vec![0.0; 500], 1000.0);
        assert!((signal.duration_secs() - 0.5).abs() < 1e-12);

        let broken = RealSignal::new(Utc::now(), vec![0.0; 500], 0.0);
        assert_eq!(broken.duration_secs(), 0.0);
    }

    #[test]
    fn magnitude_and_phase_derivation() {
        let z = vec![
            Complex64::new(3.0, 4.0),
            Complex64::new(0.0, -2.0),
            Complex64::new(0.0, 0.0),
        ];
        let spectrum = ImpedanceSpectrum::from_impedance(Utc::now(), z, vec![0.0, 1.0, 2.0]);

        assert!((spectrum.magnitude[0] - 5.0).abs() < 1e-12);
        assert!((spectrum.phase[1] + FRAC_PI_2).abs() < 1e-12);
        assert_eq!(spectrum.magnitude[2], 0.0);
        assert_eq!(spectrum.phase[2], 0.0);
    }

    #[test]
    fn points_are_index_aligned() {
        let spectrum = ImpedanceSpectrum::from_impedance(
            Utc::now(),
            vec![Complex64::new(1.0, -1.0), Complex64::new(2.0, 0.5)],
            vec![10.0, 20.0],
        );
        let points = spectrum.to_points();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].frequency, 20.0);
        assert_eq!(points[1].real, 2.0);
        assert_eq!(points[1].imag, 0.5);
    }

    #[test]
    fn spectrum_serializes_with_paired_values() {
        let spectrum = ComplexSpectrum::new(
            Utc::now(),
            vec![Complex64::new(1.0, 2.0)],
            vec![0.0],
        );
        let json = serde_json::to_value(&spectrum).unwrap();

        assert_eq!(json["values"][0]["real"], 1.0);
        assert_eq!(json["values"][0]["imag"], 2.0);
        assert_eq!(json["frequencies"][0], 0.0);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));

        let back: ComplexSpectrum = serde_json::from_value(json).unwrap();
        assert_eq!(back, spectrum);
    }
}
