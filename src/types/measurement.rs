//! Export shapes handed to the transmission and file collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::{ComplexSpectrum, ImpedanceSpectrum};
use super::wire::rfc3339_nanos;

/// One impedance value with its frequency (the "triple" export shape).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpedancePoint {
    pub frequency: f64,
    pub real: f64,
    pub imag: f64,
}

/// Full result of one measurement cycle: both half spectra plus impedance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EisMeasurement {
    pub voltage: ComplexSpectrum,
    pub current: ComplexSpectrum,
    pub impedance: ImpedanceSpectrum,
}

impl EisMeasurement {
    /// Impedance-with-frequency triples for consumers that only want Z(f).
    pub fn points(&self) -> Vec<ImpedancePoint> {
        self.impedance.to_points()
    }
}

/// An impedance spectrum tagged with its position in a generated sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumWithIteration {
    #[serde(flatten)]
    pub spectrum: ImpedanceSpectrum,
    pub iteration: usize,
}

/// Batch envelope posted to the `/batch` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpedanceBatch {
    pub batch_id: String,
    #[serde(with = "rfc3339_nanos")]
    pub timestamp: DateTime<Utc>,
    pub spectra: Vec<SpectrumWithIteration>,
}

impl ImpedanceBatch {
    /// Wrap spectra with a `batch_<unix-seconds>_<count>` id stamped now.
    pub fn new(spectra: Vec<SpectrumWithIteration>) -> Self {
        let timestamp = Utc::now();
        Self {
            batch_id: format!("batch_{}_{}", timestamp.timestamp(), spectra.len()),
            timestamp,
            spectra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn spectrum() -> ImpedanceSpectrum {
        ImpedanceSpectrum::from_impedance(
            Utc::now(),
            vec![Complex64::new(10.0, -1.0), Complex64::new(12.0, -3.0)],
            vec![100.0, 10.0],
        )
    }

    #[test]
    fn batch_id_encodes_count() {
        let batch = ImpedanceBatch::new(vec![
            SpectrumWithIteration {
                spectrum: spectrum(),
                iteration: 0,
            },
            SpectrumWithIteration {
                spectrum: spectrum(),
                iteration: 1,
            },
        ]);
        assert!(batch.batch_id.starts_with("batch_"));
        assert!(batch.batch_id.ends_with("_2"));
    }

    #[test]
    fn iteration_is_flattened_next_to_spectrum_fields() {
        let item = SpectrumWithIteration {
            spectrum: spectrum(),
            iteration: 7,
        };
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["iteration"], 7);
        assert_eq!(json["impedance"][1]["imag"], -3.0);
        assert_eq!(json["frequencies"][0], 100.0);

        let back: SpectrumWithIteration = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn points_come_from_impedance() {
        let measurement = EisMeasurement {
            voltage: ComplexSpectrum::new(Utc::now(), vec![Complex64::new(1.0, 0.0)], vec![0.0]),
            current: ComplexSpectrum::new(Utc::now(), vec![Complex64::new(1.0, 0.0)], vec![0.0]),
            impedance: spectrum(),
        };
        let points = measurement.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].real, 10.0);
    }
}
