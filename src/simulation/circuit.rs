//! Closed-form spectra of an `R_s + (R_ct ‖ CPE)` equivalent circuit
//!
//! Each generated spectrum ages the cell: `R_ct` grows linearly with the
//! generator's spectrum counter, so a sequence of spectra shows the
//! charge-transfer arc widening.

use chrono::Utc;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::config::defaults::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ, POINTS_PER_SPECTRUM};
use crate::types::ImpedanceSpectrum;

/// Element values of the equivalent circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitParameters {
    /// Solution resistance (Ω)
    pub rs: f64,
    /// Charge-transfer resistance of spectrum 0 (Ω)
    pub rct_initial: f64,
    /// Added to `R_ct` per spectrum (Ω)
    pub rct_growth: f64,
    /// CPE coefficient
    pub q: f64,
    /// CPE exponent (1 = ideal capacitor)
    pub n: f64,
}

impl Default for CircuitParameters {
    fn default() -> Self {
        CircuitPreset::Simple.parameters()
    }
}

/// Named parameter sets of increasing fitting difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitPreset {
    #[default]
    Simple,
    Medium,
    Complex,
}

impl CircuitPreset {
    pub fn parameters(self) -> CircuitParameters {
        match self {
            CircuitPreset::Simple => CircuitParameters {
                rs: 10.0,
                rct_initial: 20.0,
                rct_growth: 8.0,
                q: 1e-5,
                n: 0.85,
            },
            CircuitPreset::Medium => CircuitParameters {
                rs: 15.0,
                rct_initial: 50.0,
                rct_growth: 12.0,
                q: 5e-6,
                n: 0.75,
            },
            CircuitPreset::Complex => CircuitParameters {
                rs: 8.0,
                rct_initial: 80.0,
                rct_growth: 20.0,
                q: 2e-6,
                n: 0.65,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitPreset::Simple => "simple",
            CircuitPreset::Medium => "medium",
            CircuitPreset::Complex => "complex",
        }
    }
}

impl std::fmt::Display for CircuitPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CircuitPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(CircuitPreset::Simple),
            "medium" => Ok(CircuitPreset::Medium),
            "complex" => Ok(CircuitPreset::Complex),
            other => Err(format!(
                "unknown circuit '{other}' (expected simple, medium or complex)"
            )),
        }
    }
}

/// `n` frequencies log-spaced from 100 kHz down to 10 mHz.
pub fn log_frequencies(n: usize) -> Vec<f64> {
    let start = MAX_FREQUENCY_HZ.log10();
    let end = MIN_FREQUENCY_HZ.log10();
    match n {
        0 => Vec::new(),
        1 => vec![MAX_FREQUENCY_HZ],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| 10f64.powf(start + i as f64 * step))
                .collect()
        }
    }
}

/// Impedance of the circuit at one frequency for a given `R_ct`.
pub fn circuit_impedance(params: &CircuitParameters, rct: f64, frequency: f64) -> Complex64 {
    let omega = 2.0 * PI * frequency;
    // (jω)^n = ω^n · e^{j·nπ/2}
    let jw_pow_n = Complex64::from_polar(omega.powf(params.n), params.n * FRAC_PI_2);
    let z_cpe = Complex64::new(1.0, 0.0) / (params.q * jw_pow_n);
    let rct = Complex64::new(rct, 0.0);
    params.rs + rct * z_cpe / (rct + z_cpe)
}

/// Spectrum generator with its own spectrum counter.
#[derive(Debug, Clone, Default)]
pub struct CircuitModelGenerator {
    spectrum_counter: usize,
}

impl CircuitModelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next spectrum in the sequence; advances the counter.
    pub fn generate_spectrum(&mut self, params: &CircuitParameters) -> ImpedanceSpectrum {
        let frequencies = log_frequencies(POINTS_PER_SPECTRUM);
        let rct = params.rct_initial + self.spectrum_counter as f64 * params.rct_growth;
        let impedance = frequencies
            .iter()
            .map(|&f| circuit_impedance(params, rct, f))
            .collect();

        self.spectrum_counter += 1;
        ImpedanceSpectrum::from_impedance(Utc::now(), impedance, frequencies)
    }

    /// Number of spectra generated since creation or the last reset.
    pub fn current_spectrum(&self) -> usize {
        self.spectrum_counter
    }

    pub fn reset(&mut self) {
        self.spectrum_counter = 0;
    }
}
