//! Periodic producer feeding the voltage and current queues
//!
//! Every tick the receiver pulls one pair from its source, validates both
//! signals and offers each to its own bounded queue without waiting. A full
//! queue drops the new item; the queues never block the producer.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::source::{SignalSource, SourceEvent};
use crate::processing::SignalValidator;
use crate::types::RealSignal;

/// Consumer ends of the two queues.
#[derive(Debug)]
pub struct SignalQueues {
    pub voltage: mpsc::Receiver<RealSignal>,
    pub current: mpsc::Receiver<RealSignal>,
}

/// Counters reported when the producer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Valid pairs offered to the queues
    pub produced: u64,
    pub dropped_voltage: u64,
    pub dropped_current: u64,
    /// Pairs skipped because a signal failed validation
    pub invalid: u64,
}

/// Producer half of the acquisition loop.
pub struct Receiver {
    voltage_tx: mpsc::Sender<RealSignal>,
    current_tx: mpsc::Sender<RealSignal>,
    interval: Duration,
    validator: Arc<dyn SignalValidator>,
    cancel_token: CancellationToken,
}

impl Receiver {
    /// Create the producer and the matching consumer queues.
    ///
    /// A capacity of 0 is raised to 1. Every pair is checked with
    /// `validator` before it is queued.
    pub fn new(
        capacity: usize,
        interval: Duration,
        validator: Arc<dyn SignalValidator>,
        cancel_token: CancellationToken,
    ) -> (Self, SignalQueues) {
        let capacity = capacity.max(1);
        let (voltage_tx, voltage) = mpsc::channel(capacity);
        let (current_tx, current) = mpsc::channel(capacity);
        (
            Self {
                voltage_tx,
                current_tx,
                interval,
                validator,
                cancel_token,
            },
            SignalQueues { voltage, current },
        )
    }

    /// Produce until cancellation, end of data, or a closed queue.
    ///
    /// Dropping `self` at the end closes both queues.
    pub async fn run<S: SignalSource>(self, source: &mut S) -> ReceiverStats {
        let mut stats = ReceiverStats::default();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            source = source.source_name(),
            interval_ms = self.interval.as_millis() as u64,
            "Starting data reception"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[Receiver] Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let event = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[Receiver] Shutdown signal received");
                    break;
                }
                result = source.next_pair() => result,
            };

            let (voltage, current) = match event {
                Ok(SourceEvent::Pair(v, c)) => (v, c),
                Ok(SourceEvent::Eof) => {
                    info!(produced = stats.produced, "[Receiver] Source reached end");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "[Receiver] Source error");
                    break;
                }
            };

            if let Err(e) = self.validator.validate_real(&voltage) {
                warn!(error = %e, "Invalid voltage signal, skipping pair");
                stats.invalid += 1;
                continue;
            }
            if let Err(e) = self.validator.validate_real(&current) {
                warn!(error = %e, "Invalid current signal, skipping pair");
                stats.invalid += 1;
                continue;
            }

            stats.produced += 1;
            if !offer(&self.voltage_tx, voltage, "voltage", &mut stats.dropped_voltage)
                || !offer(&self.current_tx, current, "current", &mut stats.dropped_current)
            {
                info!("[Receiver] Consumer gone, stopping");
                break;
            }
        }

        info!(
            produced = stats.produced,
            dropped_voltage = stats.dropped_voltage,
            dropped_current = stats.dropped_current,
            invalid = stats.invalid,
            "Data reception stopped"
        );
        stats
    }
}

/// Non-blocking send. Returns `false` once the consumer has gone away.
fn offer(
    tx: &mpsc::Sender<RealSignal>,
    signal: RealSignal,
    queue: &'static str,
    dropped: &mut u64,
) -> bool {
    match tx.try_send(signal) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            *dropped += 1;
            warn!(queue, "Queue full, dropping newest sample");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::FileSource;
    use crate::processing::{DefaultValidator, ProcessingError};
    use chrono::Utc;

    const TICK: Duration = Duration::from_millis(5);

    fn validator() -> Arc<dyn SignalValidator> {
        Arc::new(DefaultValidator::new())
    }

    fn pair(marker: f64) -> (RealSignal, RealSignal) {
        let ts = Utc::now();
        (
            RealSignal::new(ts, vec![marker; 8], 100.0),
            RealSignal::new(ts, vec![marker / 10.0; 8], 100.0),
        )
    }

    fn source(markers: &[f64]) -> FileSource {
        let (v, c): (Vec<_>, Vec<_>) = markers.iter().map(|&m| pair(m)).unzip();
        FileSource::new(v, c).unwrap()
    }

    #[tokio::test]
    async fn test_forwards_pairs_and_closes_on_eof() {
        let (receiver, mut queues) = Receiver::new(10, TICK, validator(), CancellationToken::new());
        let mut src = source(&[1.0, 2.0, 3.0]);

        let stats = receiver.run(&mut src).await;
        assert_eq!(stats.produced, 3);
        assert_eq!(stats.dropped_voltage, 0);

        for expected in [1.0, 2.0, 3.0] {
            let v = queues.voltage.recv().await.unwrap();
            let c = queues.current.recv().await.unwrap();
            assert_eq!(v.values[0], expected);
            assert_eq!(c.values[0], expected / 10.0);
        }
        assert!(queues.voltage.recv().await.is_none());
        assert!(queues.current.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest() {
        let (receiver, mut queues) = Receiver::new(1, TICK, validator(), CancellationToken::new());
        let mut src = source(&[1.0, 2.0, 3.0]);

        let stats = receiver.run(&mut src).await;
        assert_eq!(stats.produced, 3);
        assert_eq!(stats.dropped_voltage, 2);
        assert_eq!(stats.dropped_current, 2);

        // The oldest item survives
        assert_eq!(queues.voltage.recv().await.unwrap().values[0], 1.0);
        assert!(queues.voltage.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_stops_producer() {
        let cancel = CancellationToken::new();
        let (receiver, _queues) = Receiver::new(10, Duration::from_secs(3600), validator(), cancel.clone());
        let mut src = source(&[1.0]);

        let handle = tokio::spawn(async move { receiver.run(&mut src).await });
        cancel.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.produced, 0);
    }

    struct FlakySource {
        items: Vec<(RealSignal, RealSignal)>,
    }

    #[async_trait::async_trait]
    impl SignalSource for FlakySource {
        async fn next_pair(&mut self) -> anyhow::Result<SourceEvent> {
            Ok(match self.items.pop() {
                Some((v, c)) => SourceEvent::Pair(v, c),
                None => SourceEvent::Eof,
            })
        }

        fn source_name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_invalid_pairs_are_skipped() {
        let (good_v, good_c) = pair(1.0);
        let bad_v = RealSignal::new(Utc::now(), vec![f64::NAN; 8], 100.0);
        let mut src = FlakySource {
            // popped from the back
            items: vec![(good_v, good_c), (bad_v, pair(2.0).1)],
        };

        let (receiver, mut queues) = Receiver::new(10, TICK, validator(), CancellationToken::new());
        let stats = receiver.run(&mut src).await;
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.produced, 1);
        assert_eq!(queues.voltage.recv().await.unwrap().values[0], 1.0);
    }

    #[tokio::test]
    async fn test_closed_consumer_stops_producer() {
        let (receiver, queues) = Receiver::new(10, TICK, validator(), CancellationToken::new());
        drop(queues);
        let mut src = source(&[1.0, 2.0, 3.0]);
        let stats = receiver.run(&mut src).await;
        assert_eq!(stats.produced, 1);
    }

    /// Rejects every signal whose first sample is negative.
    struct NonNegativeValidator;

    impl SignalValidator for NonNegativeValidator {
        fn validate_real(&self, signal: &RealSignal) -> Result<(), ProcessingError> {
            match signal.values.first() {
                Some(v) if *v < 0.0 => Err(ProcessingError::ComputationError(
                    "negative sample".to_string(),
                )),
                _ => DefaultValidator::new().validate_real(signal),
            }
        }

        fn validate_complex(
            &self,
            spectrum: &crate::types::ComplexSpectrum,
            allow_negative_frequencies: bool,
        ) -> Result<(), ProcessingError> {
            DefaultValidator::new().validate_complex(spectrum, allow_negative_frequencies)
        }

        fn validate_impedance(
            &self,
            spectrum: &crate::types::ImpedanceSpectrum,
        ) -> Result<(), ProcessingError> {
            DefaultValidator::new().validate_impedance(spectrum)
        }
    }

    #[tokio::test]
    async fn test_injected_validator_is_used() {
        let (receiver, mut queues) = Receiver::new(
            10,
            TICK,
            Arc::new(NonNegativeValidator),
            CancellationToken::new(),
        );
        let mut src = source(&[1.0, -2.0, 3.0]);

        let stats = receiver.run(&mut src).await;
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.produced, 2);
        assert_eq!(queues.voltage.recv().await.unwrap().values[0], 1.0);
        assert_eq!(queues.voltage.recv().await.unwrap().values[0], 3.0);
    }
}
