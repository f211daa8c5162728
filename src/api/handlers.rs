//! Consumer endpoint handlers
//!
//! The consumer only acknowledges and logs what it receives; nothing is
//! persisted. Counters survive for the lifetime of the server.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::types::{ImpedanceBatch, ImpedancePoint};

/// Points logged in full per request.
const PREVIEW_POINTS: usize = 5;

pub const BANNER: &str =
    "EIS Data Consumer Server\nPOST to /eis-data to send impedance data\n";

// ============================================================================
// State
// ============================================================================

/// Shared state for consumer handlers
#[derive(Clone, Default)]
pub struct ConsumerState {
    received_measurements: Arc<AtomicU64>,
    received_spectra: Arc<AtomicU64>,
}

impl ConsumerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point arrays accepted on `/eis-data`.
    pub fn received_measurements(&self) -> u64 {
        self.received_measurements.load(Ordering::Relaxed)
    }

    /// Spectra accepted across all batches.
    pub fn received_spectra(&self) -> u64 {
        self.received_spectra.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub received_measurements: u64,
    pub received_spectra: u64,
}

#[derive(Debug, Serialize)]
pub struct PointsAck {
    pub status: &'static str,
    pub received_points: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchAck {
    pub status: &'static str,
    pub batch_id: String,
    pub received_spectra: usize,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn banner() -> &'static str {
    BANNER
}

/// GET /health
pub async fn health(State(state): State<ConsumerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        received_measurements: state.received_measurements(),
        received_spectra: state.received_spectra(),
    })
}

/// POST /eis-data
pub async fn receive_points(
    State(state): State<ConsumerState>,
    Json(points): Json<Vec<ImpedancePoint>>,
) -> Json<PointsAck> {
    state.received_measurements.fetch_add(1, Ordering::Relaxed);

    match frequency_range(&points) {
        Some((min, max)) => info!(
            points = points.len(),
            min_hz = min,
            max_hz = max,
            "Received impedance data"
        ),
        None => info!(points = 0, "Received empty impedance data"),
    }
    for (i, p) in points.iter().take(PREVIEW_POINTS).enumerate() {
        info!(
            index = i,
            frequency = p.frequency,
            real = p.real,
            imag = p.imag,
            "Impedance point"
        );
    }
    if points.len() > PREVIEW_POINTS {
        info!(remaining = points.len() - PREVIEW_POINTS, "More points not shown");
    }

    Json(PointsAck {
        status: "success",
        received_points: points.len(),
    })
}

/// POST /eis-data/batch
pub async fn receive_batch(
    State(state): State<ConsumerState>,
    Json(batch): Json<ImpedanceBatch>,
) -> Json<BatchAck> {
    let count = batch.spectra.len();
    state
        .received_spectra
        .fetch_add(count as u64, Ordering::Relaxed);

    info!(batch_id = %batch.batch_id, spectra = count, "Received impedance batch");
    for s in &batch.spectra {
        info!(
            iteration = s.iteration,
            points = s.spectrum.len(),
            "Spectrum in batch"
        );
    }

    Json(BatchAck {
        status: "success",
        batch_id: batch.batch_id,
        received_spectra: count,
    })
}

/// Lowest and highest frequency in the request, if any.
fn frequency_range(points: &[ImpedancePoint]) -> Option<(f64, f64)> {
    points.iter().map(|p| p.frequency).fold(None, |acc, f| match acc {
        None => Some((f, f)),
        Some((lo, hi)) => Some((lo.min(f), hi.max(f))),
    })
}
