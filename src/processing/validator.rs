//! Well-formedness checks shared by every pipeline stage
//!
//! Each check scans in ascending index order and returns the first
//! violation it meets.

use chrono::{DateTime, Utc};
use num_complex::Complex64;

use super::ProcessingError;
use crate::types::{ComplexSpectrum, ImpedanceSpectrum, RealSignal};

/// Validation capability injected into the receiver, the transform engine
/// and the calculator.
pub trait SignalValidator: Send + Sync {
    /// Time-domain samples: non-empty, rate > 0, timestamp set, all finite.
    fn validate_real(&self, signal: &RealSignal) -> Result<(), ProcessingError>;

    /// Spectrum: non-empty paired sequences, timestamp set, all finite.
    /// With `allow_negative_frequencies == false`, any bin below 0 Hz fails.
    fn validate_complex(
        &self,
        spectrum: &ComplexSpectrum,
        allow_negative_frequencies: bool,
    ) -> Result<(), ProcessingError>;

    /// Impedance: non-empty, all populated sequences aligned, all finite.
    fn validate_impedance(&self, spectrum: &ImpedanceSpectrum) -> Result<(), ProcessingError>;
}

/// Stateless validator with the standard rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValidator;

impl DefaultValidator {
    pub const fn new() -> Self {
        Self
    }
}

impl SignalValidator for DefaultValidator {
    fn validate_real(&self, signal: &RealSignal) -> Result<(), ProcessingError> {
        if signal.values.is_empty() {
            return Err(ProcessingError::empty("values"));
        }
        // `!(x > 0)` also rejects NaN
        if !(signal.sample_rate > 0.0) || signal.sample_rate.is_infinite() {
            return Err(ProcessingError::InvalidSampleRate(signal.sample_rate));
        }
        check_timestamp(&signal.timestamp)?;
        check_finite("values", &signal.values)
    }

    fn validate_complex(
        &self,
        spectrum: &ComplexSpectrum,
        allow_negative_frequencies: bool,
    ) -> Result<(), ProcessingError> {
        if spectrum.values.is_empty() {
            return Err(ProcessingError::empty("values"));
        }
        if spectrum.frequencies.is_empty() {
            return Err(ProcessingError::empty("frequencies"));
        }
        if spectrum.values.len() != spectrum.frequencies.len() {
            return Err(ProcessingError::length_mismatch(
                "frequencies",
                spectrum.values.len(),
                spectrum.frequencies.len(),
            ));
        }
        check_timestamp(&spectrum.timestamp)?;
        check_complex_finite("values", &spectrum.values)?;

        for (index, &frequency) in spectrum.frequencies.iter().enumerate() {
            if !frequency.is_finite() {
                return Err(ProcessingError::NonFiniteValue {
                    field: "frequencies",
                    index,
                });
            }
            if !allow_negative_frequencies && frequency < 0.0 {
                return Err(ProcessingError::NegativeFrequency { index, frequency });
            }
        }
        Ok(())
    }

    fn validate_impedance(&self, spectrum: &ImpedanceSpectrum) -> Result<(), ProcessingError> {
        let n = spectrum.impedance.len();
        if n == 0 {
            return Err(ProcessingError::empty("impedance"));
        }
        if spectrum.frequencies.is_empty() {
            return Err(ProcessingError::empty("frequencies"));
        }
        if spectrum.frequencies.len() != n {
            return Err(ProcessingError::length_mismatch(
                "frequencies",
                n,
                spectrum.frequencies.len(),
            ));
        }
        // Magnitude/phase are optional, but when populated they must line up
        if !spectrum.magnitude.is_empty() && spectrum.magnitude.len() != n {
            return Err(ProcessingError::length_mismatch(
                "magnitude",
                n,
                spectrum.magnitude.len(),
            ));
        }
        if !spectrum.phase.is_empty() && spectrum.phase.len() != n {
            return Err(ProcessingError::length_mismatch("phase", n, spectrum.phase.len()));
        }
        check_timestamp(&spectrum.timestamp)?;
        check_complex_finite("impedance", &spectrum.impedance)?;
        check_finite("frequencies", &spectrum.frequencies)?;
        check_finite("magnitude", &spectrum.magnitude)?;
        check_finite("phase", &spectrum.phase)
    }
}

/// Seconds from the Unix epoch to `0001-01-01T00:00:00Z`, the zero time
/// other producers serialize for an unset timestamp.
const ZERO_TIME_UNIX_SECS: i64 = -62_135_596_800;

/// Both the zero time and the Unix epoch mean "timestamp never set".
fn check_timestamp(ts: &DateTime<Utc>) -> Result<(), ProcessingError> {
    let secs = ts.timestamp();
    if ts.timestamp_subsec_nanos() == 0 && (secs == 0 || secs == ZERO_TIME_UNIX_SECS) {
        return Err(ProcessingError::InvalidTimestamp { field: "timestamp" });
    }
    Ok(())
}

fn check_finite(field: &'static str, values: &[f64]) -> Result<(), ProcessingError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ProcessingError::NonFiniteValue { field, index }),
        None => Ok(()),
    }
}

fn check_complex_finite(field: &'static str, values: &[Complex64]) -> Result<(), ProcessingError> {
    match values
        .iter()
        .position(|v| !v.re.is_finite() || !v.im.is_finite())
    {
        Some(index) => Err(ProcessingError::NonFiniteValue { field, index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(0, 0).unwrap()
    }

    fn signal(values: Vec<f64>, sample_rate: f64) -> RealSignal {
        RealSignal::new(Utc::now(), values, sample_rate)
    }

    fn spectrum(values: Vec<Complex64>, frequencies: Vec<f64>) -> ComplexSpectrum {
        ComplexSpectrum::new(Utc::now(), values, frequencies)
    }

    #[test]
    fn test_valid_real_signal() {
        let v = DefaultValidator::new();
        assert!(v.validate_real(&signal(vec![1.0, -2.0, 3.5], 1000.0)).is_ok());
    }

    #[test]
    fn test_real_signal_rules() {
        let v = DefaultValidator::new();

        assert!(matches!(
            v.validate_real(&signal(vec![], 1000.0)),
            Err(ProcessingError::InvalidLength { field: "values", .. })
        ));
        assert_eq!(
            v.validate_real(&signal(vec![1.0], 0.0)),
            Err(ProcessingError::InvalidSampleRate(0.0))
        );
        assert_eq!(
            v.validate_real(&signal(vec![1.0], -5.0)),
            Err(ProcessingError::InvalidSampleRate(-5.0))
        );
        assert!(matches!(
            v.validate_real(&signal(vec![1.0], f64::NAN)),
            Err(ProcessingError::InvalidSampleRate(_))
        ));
        assert_eq!(
            v.validate_real(&RealSignal::new(epoch(), vec![1.0], 10.0)),
            Err(ProcessingError::InvalidTimestamp { field: "timestamp" })
        );
        let zero_time = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            v.validate_real(&RealSignal::new(zero_time, vec![1.0], 10.0)),
            Err(ProcessingError::InvalidTimestamp { field: "timestamp" })
        );
        let just_after = zero_time + chrono::Duration::seconds(1);
        assert!(v.validate_real(&RealSignal::new(just_after, vec![1.0], 10.0)).is_ok());
    }

    #[test]
    fn test_first_non_finite_sample_is_reported() {
        let v = DefaultValidator::new();
        let err = v
            .validate_real(&signal(vec![1.0, f64::INFINITY, f64::NAN], 10.0))
            .unwrap_err();
        assert_eq!(
            err,
            ProcessingError::NonFiniteValue {
                field: "values",
                index: 1
            }
        );
    }

    #[test]
    fn test_rule_order_length_before_rate() {
        // Empty + bad rate + epoch: the length violation is reported
        let v = DefaultValidator::new();
        let err = v
            .validate_real(&RealSignal::new(epoch(), vec![], -1.0))
            .unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidLength { .. }));
    }

    #[test]
    fn test_complex_spectrum_lengths() {
        let v = DefaultValidator::new();
        let one = Complex64::new(1.0, 0.0);

        assert!(matches!(
            v.validate_complex(&spectrum(vec![], vec![]), true),
            Err(ProcessingError::InvalidLength { field: "values", .. })
        ));
        assert!(matches!(
            v.validate_complex(&spectrum(vec![one], vec![]), true),
            Err(ProcessingError::InvalidLength {
                field: "frequencies",
                ..
            })
        ));
        assert!(matches!(
            v.validate_complex(&spectrum(vec![one, one], vec![0.0]), true),
            Err(ProcessingError::InvalidLength {
                field: "frequencies",
                ..
            })
        ));
    }

    #[test]
    fn test_complex_parts_checked_independently() {
        let v = DefaultValidator::new();
        let values = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 1.0),
            Complex64::new(2.0, f64::NAN),
        ];
        assert_eq!(
            v.validate_complex(&spectrum(values, vec![0.0, 1.0, 2.0]), true),
            Err(ProcessingError::NonFiniteValue {
                field: "values",
                index: 2
            })
        );

        let values = vec![Complex64::new(f64::NEG_INFINITY, 0.0)];
        assert!(v.validate_complex(&spectrum(values, vec![0.0]), true).is_err());
    }

    #[test]
    fn test_negative_frequencies_only_allowed_in_full_spectrum() {
        let v = DefaultValidator::new();
        let full = spectrum(
            vec![Complex64::new(1.0, 0.0); 4],
            vec![0.0, 1.0, -2.0, -1.0],
        );

        assert!(v.validate_complex(&full, true).is_ok());
        assert_eq!(
            v.validate_complex(&full, false),
            Err(ProcessingError::NegativeFrequency {
                index: 2,
                frequency: -2.0
            })
        );
    }

    #[test]
    fn test_non_finite_frequency() {
        let v = DefaultValidator::new();
        let s = spectrum(vec![Complex64::new(1.0, 0.0); 2], vec![0.0, f64::NAN]);
        assert_eq!(
            v.validate_complex(&s, true),
            Err(ProcessingError::NonFiniteValue {
                field: "frequencies",
                index: 1
            })
        );
    }

    #[test]
    fn test_impedance_rules() {
        let v = DefaultValidator::new();
        let z = vec![Complex64::new(10.0, -2.0), Complex64::new(5.0, 0.0)];
        let good = ImpedanceSpectrum::from_impedance(Utc::now(), z.clone(), vec![0.0, 1.0]);
        assert!(v.validate_impedance(&good).is_ok());

        // magnitude/phase are optional
        let bare = ImpedanceSpectrum {
            magnitude: vec![],
            phase: vec![],
            ..good.clone()
        };
        assert!(v.validate_impedance(&bare).is_ok());

        let short_mag = ImpedanceSpectrum {
            magnitude: vec![1.0],
            ..good.clone()
        };
        assert!(matches!(
            v.validate_impedance(&short_mag),
            Err(ProcessingError::InvalidLength {
                field: "magnitude",
                ..
            })
        ));

        let short_phase = ImpedanceSpectrum {
            phase: vec![0.0, 0.0, 0.0],
            ..good.clone()
        };
        assert!(matches!(
            v.validate_impedance(&short_phase),
            Err(ProcessingError::InvalidLength { field: "phase", .. })
        ));

        let nan_z = ImpedanceSpectrum {
            impedance: vec![z[0], Complex64::new(f64::NAN, 0.0)],
            ..good.clone()
        };
        assert_eq!(
            v.validate_impedance(&nan_z),
            Err(ProcessingError::NonFiniteValue {
                field: "impedance",
                index: 1
            })
        );

        let stale = ImpedanceSpectrum {
            timestamp: epoch(),
            ..good
        };
        assert!(matches!(
            v.validate_impedance(&stale),
            Err(ProcessingError::InvalidTimestamp { .. })
        ));
    }
}
