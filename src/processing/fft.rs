//! Spectral transform engine
//!
//! Mixed-radix recursive DFT for arbitrary lengths:
//!
//! - even `n`: radix-2 split into even/odd-indexed halves, butterfly combine
//! - odd `n > 1`: direct O(n²) DFT for that subproblem
//! - `n == 1`: identity
//!
//! The recursion reads the input through a stride instead of copying the
//! even/odd subsequences, and writes both halves straight into the output
//! slice so the butterfly runs in place. Depth is `O(log n)`; the only
//! allocation per transform is the output buffer.
//!
//! No window is applied and the output is not normalised:
//! `X[k] = Σ_j x[j]·exp(-2πi·k·j/n)`.
//!
//! # Example
//!
//! ```ignore
//! use deis::processing::{MixedRadixFft, SpectralTransform};
//!
//! let engine = MixedRadixFft::default();
//! let full = engine.transform(&signal)?;
//! let half = engine.extract_half_spectrum(&full)?;
//! ```

use num_complex::Complex64;
use std::f64::consts::PI;
use std::sync::Arc;

use super::{DefaultValidator, ProcessingError, SignalValidator};
use crate::types::{ComplexSpectrum, RealSignal};

/// Transform capability injected into the impedance calculator.
pub trait SpectralTransform: Send + Sync {
    /// Full spectrum of a real signal, with canonical (signed) bin frequencies.
    fn transform(&self, signal: &RealSignal) -> Result<ComplexSpectrum, ProcessingError>;

    /// First `max(1, n/2)` entries of a full spectrum (positional cut).
    fn extract_half_spectrum(
        &self,
        spectrum: &ComplexSpectrum,
    ) -> Result<ComplexSpectrum, ProcessingError>;
}

// ============================================================================
// Engine
// ============================================================================

/// Recursive mixed-radix transform with input/output validation.
#[derive(Clone)]
pub struct MixedRadixFft {
    validator: Arc<dyn SignalValidator>,
}

impl MixedRadixFft {
    pub fn new(validator: Arc<dyn SignalValidator>) -> Self {
        Self { validator }
    }
}

impl Default for MixedRadixFft {
    fn default() -> Self {
        Self::new(Arc::new(DefaultValidator::new()))
    }
}

impl std::fmt::Debug for MixedRadixFft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixedRadixFft").finish_non_exhaustive()
    }
}

impl SpectralTransform for MixedRadixFft {
    fn transform(&self, signal: &RealSignal) -> Result<ComplexSpectrum, ProcessingError> {
        self.validator.validate_real(signal)?;

        let n = signal.values.len();
        let input: Vec<Complex64> = signal
            .values
            .iter()
            .map(|&x| Complex64::new(x, 0.0))
            .collect();

        let values = compute_dft(&input)?;
        let frequencies = bin_frequencies(n, signal.sample_rate)?;

        tracing::trace!(n, sample_rate = signal.sample_rate, "Spectrum computed");

        let spectrum = ComplexSpectrum::new(signal.timestamp, values, frequencies);
        self.validator.validate_complex(&spectrum, true)?;
        Ok(spectrum)
    }

    fn extract_half_spectrum(
        &self,
        spectrum: &ComplexSpectrum,
    ) -> Result<ComplexSpectrum, ProcessingError> {
        self.validator.validate_complex(spectrum, true)?;

        let half = (spectrum.values.len() / 2).max(1);
        let result = ComplexSpectrum::new(
            spectrum.timestamp,
            spectrum.values[..half].to_vec(),
            spectrum.frequencies[..half].to_vec(),
        );

        self.validator.validate_complex(&result, false)?;
        Ok(result)
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Forward DFT of `input` (any length ≥ 1).
pub(crate) fn compute_dft(input: &[Complex64]) -> Result<Vec<Complex64>, ProcessingError> {
    let n = input.len();
    if n == 0 {
        return Err(ProcessingError::empty("values"));
    }
    let mut output = vec![Complex64::new(0.0, 0.0); n];
    transform_strided(input, 1, &mut output)?;
    Ok(output)
}

/// Transform the sequence `input[0], input[stride], ...` of length
/// `output.len()` into `output`.
fn transform_strided(
    input: &[Complex64],
    stride: usize,
    output: &mut [Complex64],
) -> Result<(), ProcessingError> {
    let n = output.len();
    match n {
        0 => Err(ProcessingError::empty("values")),
        1 => {
            output[0] = input[0];
            Ok(())
        }
        _ if n % 2 == 0 => {
            let half = n / 2;
            let (evens, odds) = output.split_at_mut(half);
            transform_strided(input, stride * 2, evens)?;
            transform_strided(&input[stride..], stride * 2, odds)?;

            for k in 0..half {
                let twiddle = twiddle(k, n)?;
                let e = evens[k];
                let t = twiddle * odds[k];
                evens[k] = e + t;
                odds[k] = e - t;
            }
            Ok(())
        }
        _ => direct_dft(input, stride, output),
    }
}

/// O(n²) DFT for odd-length subproblems.
fn direct_dft(
    input: &[Complex64],
    stride: usize,
    output: &mut [Complex64],
) -> Result<(), ProcessingError> {
    let n = output.len();
    for (k, slot) in output.iter_mut().enumerate() {
        let mut sum = Complex64::new(0.0, 0.0);
        for j in 0..n {
            // k·j mod n keeps the angle in [0, 2π) without changing its value
            sum += input[j * stride] * twiddle((k * j) % n, n)?;
        }
        *slot = sum;
    }
    Ok(())
}

/// `exp(-2πi·k/n)`
fn twiddle(k: usize, n: usize) -> Result<Complex64, ProcessingError> {
    let angle = -2.0 * PI * k as f64 / n as f64;
    if !angle.is_finite() {
        return Err(ProcessingError::ComputationError(format!(
            "invalid twiddle angle at k={k}, n={n}"
        )));
    }
    Ok(Complex64::from_polar(1.0, angle))
}

// ============================================================================
// Frequency Bins
// ============================================================================

/// Canonical FFT bin layout: `i·fs/n` for `i < n/2`, `(i-n)·fs/n` after.
///
/// The back half is labelled with negative frequencies, not dropped.
pub fn bin_frequencies(n: usize, sample_rate: f64) -> Result<Vec<f64>, ProcessingError> {
    if n == 0 {
        return Err(ProcessingError::empty("frequencies"));
    }
    if !(sample_rate > 0.0) {
        return Err(ProcessingError::InvalidSampleRate(sample_rate));
    }

    let resolution = sample_rate / n as f64;
    let half = n / 2;
    Ok((0..n)
        .map(|i| {
            if i < half {
                i as f64 * resolution
            } else {
                (i as f64 - n as f64) * resolution
            }
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
