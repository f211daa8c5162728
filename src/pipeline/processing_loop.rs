//! Consumer loop: pair queued signals, compute impedance, deliver.
//!
//! Pairing is best effort. Each cycle waits for a voltage signal and then
//! takes whatever current signal is already queued; if none is waiting the
//! voltage signal is discarded and the cycle is counted as unpaired.

use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::output::MeasurementSink;
use crate::acquisition::SignalQueues;
use crate::processing::ImpedanceCalculator;

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Voltage signals taken from the queue
    pub cycles: u64,
    /// Measurements delivered
    pub processed: u64,
    /// Cycles skipped for lack of a current signal
    pub unpaired: u64,
    /// Cycles where the calculator rejected the pair
    pub failed: u64,
    pub sink_failures: u64,
}

/// Owns everything the consumer loop needs.
pub struct ProcessingLoop {
    calculator: Arc<dyn ImpedanceCalculator>,
    sink: Box<dyn MeasurementSink>,
    cancel_token: CancellationToken,
}

impl ProcessingLoop {
    pub fn new(
        calculator: Arc<dyn ImpedanceCalculator>,
        sink: Box<dyn MeasurementSink>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            calculator,
            sink,
            cancel_token,
        }
    }

    /// Run until cancellation or until the voltage queue closes.
    pub async fn run(self, mut queues: SignalQueues) -> LoopStats {
        let mut stats = LoopStats::default();
        info!(sink = self.sink.sink_name(), "Signal processor started");

        loop {
            let voltage = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[ProcessingLoop] Shutdown signal received");
                    break;
                }
                item = queues.voltage.recv() => match item {
                    Some(v) => v,
                    None => {
                        info!("[ProcessingLoop] Voltage queue closed");
                        break;
                    }
                },
            };
            stats.cycles += 1;

            let current = match queues.current.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    warn!("No current signal available for voltage signal, skipping cycle");
                    stats.unpaired += 1;
                    continue;
                }
            };

            let measurement = match self.calculator.process_measurement(&voltage, &current) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "Error calculating impedance");
                    stats.failed += 1;
                    continue;
                }
            };
            debug!(bins = measurement.impedance.len(), "Measurement ready");

            match self.sink.deliver(&measurement).await {
                Ok(()) => stats.processed += 1,
                Err(e) => {
                    stats.sink_failures += 1;
                    warn!(sink = self.sink.sink_name(), error = %e, "Failed to deliver measurement");
                    if !self.sink.is_healthy() {
                        warn!(sink = self.sink.sink_name(), "Sink is unhealthy");
                    }
                }
            }
        }

        info!(
            cycles = stats.cycles,
            processed = stats.processed,
            unpaired = stats.unpaired,
            failed = stats.failed,
            sink_failures = stats.sink_failures,
            "Signal processor stopped"
        );
        stats
    }
}
