//! CSV ingestion for recorded signals and precomputed impedance spectra
//!
//! ## Sample files
//!
//! ```text
//! timestamp,time_offset,value
//! 2024-01-15T10:30:00.000000000Z,0.000,1.0021
//! 2024-01-15T10:30:00.001000000Z,0.001,1.0187
//! ```
//!
//! Data rows are cut into consecutive chunks; each chunk becomes one
//! `RealSignal` stamped with its first row's timestamp.
//!
//! ## Impedance files
//!
//! Columns are located by header name (`Frequency_Hz`, `Z_real`, `Z_imag`,
//! `Spectrum_Number`) so both the export layout and the generator's own
//! `Z_real,Z_imag,Spectrum_Number,Frequency_Hz` layout load.

use chrono::{DateTime, Utc};
use num_complex::Complex64;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::processing::{
    DefaultCalculator, DefaultValidator, ImpedanceCalculator, ProcessingError, SignalValidator,
};
use crate::types::wire::rfc3339_nanos;
use crate::types::{ImpedanceSpectrum, RealSignal, SpectrumWithIteration};

/// Columns in a sample row: timestamp, offset, value.
const SAMPLE_COLUMNS: usize = 3;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV must have a header and at least one data row")]
    NoData,

    #[error("Chunk size must be greater than 0")]
    InvalidChunkSize,

    #[error("Line {line}: expected at least {expected} columns, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: invalid timestamp '{value}': {source}")]
    Timestamp {
        line: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Line {line}: invalid {column} '{value}'")]
    Number {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("Missing column '{0}' in header")]
    MissingColumn(&'static str),

    #[error("Chunk {chunk} failed validation: {source}")]
    InvalidChunk {
        chunk: usize,
        #[source]
        source: ProcessingError,
    },

    #[error("Voltage and current must have the same number of signals: got {voltage} voltage, {current} current")]
    ChunkCountMismatch { voltage: usize, current: usize },

    #[error("Signal pair {index} is incompatible: {source}")]
    IncompatiblePair {
        index: usize,
        #[source]
        source: ProcessingError,
    },

    #[error("Spectrum {spectrum}: {source}")]
    InvalidSpectrum {
        spectrum: usize,
        #[source]
        source: ProcessingError,
    },
}

// ============================================================================
// Sample CSV
// ============================================================================

/// Load one sample file as a sequence of validated signals.
pub fn load_signal_csv(
    path: impl AsRef<Path>,
    sample_rate: f64,
    samples_per_chunk: usize,
) -> Result<Vec<RealSignal>, LoadError> {
    let contents = read_file(path.as_ref())?;
    let signals = parse_signal_csv(&contents, sample_rate, samples_per_chunk)?;
    tracing::info!(
        file = %path.as_ref().display(),
        signals = signals.len(),
        "Loaded signal CSV"
    );
    Ok(signals)
}

/// Parse sample CSV text into validated signals of `samples_per_chunk` rows
/// (the last chunk may be shorter).
pub fn parse_signal_csv(
    contents: &str,
    sample_rate: f64,
    samples_per_chunk: usize,
) -> Result<Vec<RealSignal>, LoadError> {
    if samples_per_chunk == 0 {
        return Err(LoadError::InvalidChunkSize);
    }

    let rows = data_rows(contents);
    if rows.is_empty() {
        return Err(LoadError::NoData);
    }

    let validator = DefaultValidator::new();
    let mut signals = Vec::with_capacity(rows.len().div_ceil(samples_per_chunk));

    for (chunk_index, chunk) in rows.chunks(samples_per_chunk).enumerate() {
        let mut timestamp: Option<DateTime<Utc>> = None;
        let mut values = Vec::with_capacity(chunk.len());

        for &(line, raw) in chunk {
            let fields = csv_split(raw);
            if fields.len() < SAMPLE_COLUMNS {
                return Err(LoadError::ShortRow {
                    line,
                    expected: SAMPLE_COLUMNS,
                    found: fields.len(),
                });
            }
            if timestamp.is_none() {
                let ts = rfc3339_nanos::parse(&fields[0]).map_err(|source| {
                    LoadError::Timestamp {
                        line,
                        value: fields[0].clone(),
                        source,
                    }
                })?;
                timestamp = Some(ts);
            }
            values.push(parse_number(&fields[2], line, "value")?);
        }

        // Chunks are never empty, so the first row always sets the timestamp
        let Some(timestamp) = timestamp else {
            continue;
        };
        let signal = RealSignal::new(timestamp, values, sample_rate);
        validator
            .validate_real(&signal)
            .map_err(|source| LoadError::InvalidChunk {
                chunk: chunk_index,
                source,
            })?;
        signals.push(signal);
    }

    Ok(signals)
}

/// Load voltage and current files and check every pair is compatible.
pub fn load_signal_pair(
    voltage_path: impl AsRef<Path>,
    current_path: impl AsRef<Path>,
    sample_rate: f64,
    samples_per_chunk: usize,
) -> Result<(Vec<RealSignal>, Vec<RealSignal>), LoadError> {
    let voltage = load_signal_csv(voltage_path, sample_rate, samples_per_chunk)?;
    let current = load_signal_csv(current_path, sample_rate, samples_per_chunk)?;
    check_pairs(&voltage, &current)?;
    Ok((voltage, current))
}

/// Chunk counts must agree and each pair must pass the calculator's checks.
pub fn check_pairs(voltage: &[RealSignal], current: &[RealSignal]) -> Result<(), LoadError> {
    if voltage.len() != current.len() {
        return Err(LoadError::ChunkCountMismatch {
            voltage: voltage.len(),
            current: current.len(),
        });
    }
    let calculator = DefaultCalculator::default();
    for (index, (v, i)) in voltage.iter().zip(current.iter()).enumerate() {
        calculator
            .validate_pair(v, i)
            .map_err(|source| LoadError::IncompatiblePair { index, source })?;
    }
    Ok(())
}

// ============================================================================
// Impedance CSV
// ============================================================================

/// Column positions resolved from an impedance CSV header.
struct ImpedanceColumns {
    frequency: usize,
    real: usize,
    imag: usize,
    spectrum: usize,
}

impl ImpedanceColumns {
    fn from_header(header: &str) -> Result<Self, LoadError> {
        let names: Vec<String> = csv_split(header)
            .into_iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| n == &name.to_ascii_lowercase())
                .ok_or(LoadError::MissingColumn(name))
        };
        Ok(Self {
            frequency: find("Frequency_Hz")?,
            real: find("Z_real")?,
            imag: find("Z_imag")?,
            spectrum: find("Spectrum_Number")?,
        })
    }

    fn width(&self) -> usize {
        self.frequency.max(self.real).max(self.imag).max(self.spectrum) + 1
    }
}

/// Load an impedance CSV, grouping rows by spectrum number.
pub fn load_impedance_csv(path: impl AsRef<Path>) -> Result<Vec<SpectrumWithIteration>, LoadError> {
    let contents = read_file(path.as_ref())?;
    let spectra = parse_impedance_csv(&contents)?;
    tracing::info!(
        file = %path.as_ref().display(),
        spectra = spectra.len(),
        "Loaded impedance CSV"
    );
    Ok(spectra)
}

/// Parse impedance CSV text. Spectra come out in order of first appearance,
/// rows within a spectrum in file order.
pub fn parse_impedance_csv(contents: &str) -> Result<Vec<SpectrumWithIteration>, LoadError> {
    let mut lines = contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or(LoadError::NoData)?;
    let columns = ImpedanceColumns::from_header(header)?;
    let width = columns.width();

    // (spectrum number, impedance, frequencies)
    let mut groups: Vec<(usize, Vec<Complex64>, Vec<f64>)> = Vec::new();

    for (line, raw) in lines {
        let fields = csv_split(raw);
        if fields.len() < width {
            return Err(LoadError::ShortRow {
                line,
                expected: width,
                found: fields.len(),
            });
        }
        let frequency = parse_number(&fields[columns.frequency], line, "Frequency_Hz")?;
        let real = parse_number(&fields[columns.real], line, "Z_real")?;
        let imag = parse_number(&fields[columns.imag], line, "Z_imag")?;
        let number = parse_spectrum_number(&fields[columns.spectrum], line)?;

        let group = match groups.iter().position(|(n, _, _)| *n == number) {
            Some(idx) => &mut groups[idx],
            None => {
                groups.push((number, Vec::new(), Vec::new()));
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        group.1.push(Complex64::new(real, imag));
        group.2.push(frequency);
    }

    if groups.is_empty() {
        return Err(LoadError::NoData);
    }

    let validator = DefaultValidator::new();
    let now = Utc::now();
    groups
        .into_iter()
        .map(|(iteration, impedance, frequencies)| {
            let spectrum = ImpedanceSpectrum::from_impedance(now, impedance, frequencies);
            validator
                .validate_impedance(&spectrum)
                .map_err(|source| LoadError::InvalidSpectrum {
                    spectrum: iteration,
                    source,
                })?;
            Ok(SpectrumWithIteration {
                spectrum,
                iteration,
            })
        })
        .collect()
}

// ============================================================================
// Helpers
// ============================================================================

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Non-blank lines after the header, with 1-based line numbers.
fn data_rows(contents: &str) -> Vec<(usize, &str)> {
    contents
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, l))
        .collect()
}

fn parse_number(raw: &str, line: usize, column: &'static str) -> Result<f64, LoadError> {
    raw.trim().parse::<f64>().map_err(|_| LoadError::Number {
        line,
        column,
        value: raw.to_string(),
    })
}

/// Spectrum numbers are integers; `3.0` is accepted as `3`.
fn parse_spectrum_number(raw: &str, line: usize) -> Result<usize, LoadError> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<usize>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Ok(f as usize),
        _ => Err(LoadError::Number {
            line,
            column: "Spectrum_Number",
            value: raw.to_string(),
        }),
    }
}

/// Split a CSV line, honouring double-quoted fields and `""` escapes.
/// Fields are trimmed.
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn sample_csv(rows: usize, start: &str) -> String {
        let start = rfc3339_nanos::parse(start).unwrap();
        let mut s = String::from("timestamp,time_offset,value\n");
        for i in 0..rows {
            let ts = start + chrono::Duration::milliseconds(i as i64);
            let _ = writeln!(
                s,
                "{},{:.3},{}",
                rfc3339_nanos::format(&ts),
                i as f64 / 1000.0,
                (i as f64 * 0.1).sin()
            );
        }
        s
    }

    #[test]
    fn test_chunking() {
        let csv = sample_csv(10, "2024-01-15T10:30:00Z");
        let signals = parse_signal_csv(&csv, 1000.0, 4).unwrap();
        assert_eq!(signals.len(), 3);
        assert_eq!(signals[0].len(), 4);
        assert_eq!(signals[2].len(), 2);
        assert_eq!(
            rfc3339_nanos::format(&signals[1].timestamp),
            "2024-01-15T10:30:00.004000000Z"
        );
        assert!((signals[0].values[1] - 0.1f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_header_only_is_error() {
        assert!(matches!(
            parse_signal_csv("timestamp,time_offset,value\n", 1000.0, 10),
            Err(LoadError::NoData)
        ));
        assert!(matches!(
            parse_signal_csv("", 1000.0, 10),
            Err(LoadError::NoData)
        ));
    }

    #[test]
    fn test_short_row_names_line() {
        let csv = "timestamp,time_offset,value\n2024-01-15T10:30:00Z,0.0,1.0\n2024-01-15T10:30:00Z,0.001\n";
        match parse_signal_csv(csv, 1000.0, 10) {
            Err(LoadError::ShortRow { line, found, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_bad_timestamp_and_value() {
        let csv = "timestamp,time_offset,value\nyesterday,0.0,1.0\n";
        assert!(matches!(
            parse_signal_csv(csv, 1000.0, 10),
            Err(LoadError::Timestamp { line: 2, .. })
        ));

        let csv = "timestamp,time_offset,value\n2024-01-15T10:30:00Z,0.0,abc\n";
        assert!(matches!(
            parse_signal_csv(csv, 1000.0, 10),
            Err(LoadError::Number { line: 2, column: "value", .. })
        ));
    }

    #[test]
    fn test_non_finite_value_fails_validation() {
        let csv = "timestamp,time_offset,value\n2024-01-15T10:30:00Z,0.0,1.0\n2024-01-15T10:30:00Z,0.001,NaN\n";
        assert!(matches!(
            parse_signal_csv(csv, 1000.0, 10),
            Err(LoadError::InvalidChunk { chunk: 0, .. })
        ));
    }

    #[test]
    fn test_zero_chunk_size() {
        let csv = sample_csv(3, "2024-01-15T10:30:00Z");
        assert!(matches!(
            parse_signal_csv(&csv, 1000.0, 0),
            Err(LoadError::InvalidChunkSize)
        ));
    }

    #[test]
    fn test_pair_checks() {
        let v = parse_signal_csv(&sample_csv(8, "2024-01-15T10:30:00Z"), 1000.0, 4).unwrap();
        let i = parse_signal_csv(&sample_csv(8, "2024-01-15T10:30:00.050Z"), 1000.0, 4).unwrap();
        assert!(check_pairs(&v, &i).is_ok());

        let short = parse_signal_csv(&sample_csv(4, "2024-01-15T10:30:00Z"), 1000.0, 4).unwrap();
        assert!(matches!(
            check_pairs(&v, &short),
            Err(LoadError::ChunkCountMismatch {
                voltage: 2,
                current: 1
            })
        ));

        let late = parse_signal_csv(&sample_csv(8, "2024-01-15T10:30:01Z"), 1000.0, 4).unwrap();
        assert!(matches!(
            check_pairs(&v, &late),
            Err(LoadError::IncompatiblePair { index: 0, .. })
        ));
    }

    #[test]
    fn test_impedance_csv_groups_by_spectrum() {
        let csv = "\
Frequency_Hz,Z_real,Z_imag,Spectrum_Number
100000,10.0,-0.1,0
10,15.0,-5.0,0
100000,10.1,-0.2,1
10,18.0,-6.0,1
1,29.0,-1.0,0
";
        let spectra = parse_impedance_csv(csv).unwrap();
        assert_eq!(spectra.len(), 2);
        assert_eq!(spectra[0].iteration, 0);
        assert_eq!(spectra[0].spectrum.frequencies, vec![100000.0, 10.0, 1.0]);
        assert_eq!(spectra[1].spectrum.impedance[1], Complex64::new(18.0, -6.0));
        assert!((spectra[0].spectrum.magnitude[0] - (100.0f64 + 0.01).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_impedance_csv_generator_layout() {
        let csv = "\
Z_real,Z_imag,Spectrum_Number,Frequency_Hz
1.000000000000e+01,-1.000000000000e-01,3,1.000000000000e+05
";
        let spectra = parse_impedance_csv(csv).unwrap();
        assert_eq!(spectra.len(), 1);
        assert_eq!(spectra[0].iteration, 3);
        assert_eq!(spectra[0].spectrum.frequencies, vec![1e5]);
    }

    #[test]
    fn test_impedance_csv_missing_column() {
        assert!(matches!(
            parse_impedance_csv("Frequency_Hz,Z_real,Spectrum_Number\n1,2,0\n"),
            Err(LoadError::MissingColumn("Z_imag"))
        ));
    }

    #[test]
    fn test_spectrum_number_forms() {
        assert_eq!(parse_spectrum_number("4", 2).unwrap(), 4);
        assert_eq!(parse_spectrum_number("4.0", 2).unwrap(), 4);
        assert!(parse_spectrum_number("4.5", 2).is_err());
        assert!(parse_spectrum_number("-1", 2).is_err());
    }

    #[test]
    fn test_csv_split_quotes() {
        assert_eq!(csv_split("a, \"b,c\" ,d"), vec!["a", "b,c", "d"]);
        assert_eq!(csv_split("\"say \"\"hi\"\"\""), vec!["say \"hi\""]);
    }
}
