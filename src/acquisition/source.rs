//! Signal source abstraction for the acquisition loop.
//!
//! A source hands out one voltage/current pair per call: either freshly
//! synthesized or replayed from pre-loaded CSV chunks.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use super::csv_loader::{self, LoadError};
use super::generator::SyntheticGenerator;
use crate::types::RealSignal;

/// Events produced by a signal source.
#[derive(Debug)]
pub enum SourceEvent {
    /// One voltage signal and its matching current signal.
    Pair(RealSignal, RealSignal),
    /// No more data.
    Eof,
}

/// Where voltage/current pairs come from.
///
/// The receiver calls [`next_pair`](SignalSource::next_pair) once per tick,
/// inside a `select!` with cancellation.
#[async_trait]
pub trait SignalSource: Send + 'static {
    async fn next_pair(&mut self) -> Result<SourceEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Generates a new pair on every call; never reaches `Eof`.
pub struct SyntheticSource {
    generator: SyntheticGenerator,
    sample_rate: f64,
    samples: usize,
}

impl SyntheticSource {
    pub fn new(sample_rate: f64, samples: usize) -> Self {
        Self::with_generator(SyntheticGenerator::new(), sample_rate, samples)
    }

    pub fn with_generator(generator: SyntheticGenerator, sample_rate: f64, samples: usize) -> Self {
        Self {
            generator,
            sample_rate,
            samples,
        }
    }
}

#[async_trait]
impl SignalSource for SyntheticSource {
    async fn next_pair(&mut self) -> Result<SourceEvent> {
        let (voltage, current) = self.generator.generate_pair(self.sample_rate, self.samples)?;
        Ok(SourceEvent::Pair(voltage, current))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

// ============================================================================
// File Source
// ============================================================================

/// Replays pre-loaded voltage/current chunks in order.
pub struct FileSource {
    pairs: std::vec::IntoIter<(RealSignal, RealSignal)>,
    total: usize,
    sent: usize,
}

impl FileSource {
    /// Build from already-loaded chunks; counts and pairs are checked.
    pub fn new(voltage: Vec<RealSignal>, current: Vec<RealSignal>) -> Result<Self, LoadError> {
        csv_loader::check_pairs(&voltage, &current)?;
        let pairs: Vec<_> = voltage.into_iter().zip(current).collect();
        Ok(Self {
            total: pairs.len(),
            pairs: pairs.into_iter(),
            sent: 0,
        })
    }

    /// Load both CSV files up front.
    pub fn from_files(
        voltage_path: &Path,
        current_path: &Path,
        sample_rate: f64,
        samples_per_chunk: usize,
    ) -> Result<Self, LoadError> {
        let (voltage, current) =
            csv_loader::load_signal_pair(voltage_path, current_path, sample_rate, samples_per_chunk)?;
        tracing::info!(
            voltage = %voltage_path.display(),
            current = %current_path.display(),
            pairs = voltage.len(),
            "Loaded signal pairs from files"
        );
        Self::new(voltage, current)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.total - self.sent
    }
}

#[async_trait]
impl SignalSource for FileSource {
    async fn next_pair(&mut self) -> Result<SourceEvent> {
        match self.pairs.next() {
            Some((voltage, current)) => {
                self.sent += 1;
                tracing::info!(
                    pair = self.sent,
                    total = self.total,
                    progress = format!("{:.1}%", self.sent as f64 / self.total as f64 * 100.0),
                    "Replaying signal pair"
                );
                Ok(SourceEvent::Pair(voltage, current))
            }
            None => Ok(SourceEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signal(v: f64) -> RealSignal {
        RealSignal::new(Utc::now(), vec![v; 4], 100.0)
    }

    #[tokio::test]
    async fn test_file_source_replays_then_eof() {
        let mut source =
            FileSource::new(vec![signal(1.0), signal(2.0)], vec![signal(0.5), signal(0.25)])
                .unwrap();
        assert_eq!(source.total(), 2);

        match source.next_pair().await.unwrap() {
            SourceEvent::Pair(v, c) => {
                assert_eq!(v.values[0], 1.0);
                assert_eq!(c.values[0], 0.5);
            }
            SourceEvent::Eof => panic!("expected a pair"),
        }
        assert_eq!(source.remaining(), 1);
        assert!(matches!(source.next_pair().await.unwrap(), SourceEvent::Pair(..)));
        assert!(matches!(source.next_pair().await.unwrap(), SourceEvent::Eof));
        assert!(matches!(source.next_pair().await.unwrap(), SourceEvent::Eof));
    }

    #[test]
    fn test_file_source_rejects_uneven_inputs() {
        assert!(matches!(
            FileSource::new(vec![signal(1.0)], vec![]),
            Err(LoadError::ChunkCountMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_synthetic_source_never_ends() {
        let mut source =
            SyntheticSource::with_generator(SyntheticGenerator::with_seed(5), 1000.0, 64);
        for _ in 0..3 {
            match source.next_pair().await.unwrap() {
                SourceEvent::Pair(v, c) => {
                    assert_eq!(v.len(), 64);
                    assert_eq!(c.len(), 64);
                }
                SourceEvent::Eof => panic!("synthetic source ended"),
            }
        }
        assert_eq!(source.source_name(), "synthetic");
    }

    #[tokio::test]
    async fn test_synthetic_source_reports_bad_settings() {
        let mut source = SyntheticSource::new(0.0, 64);
        assert!(source.next_pair().await.is_err());
    }
}
