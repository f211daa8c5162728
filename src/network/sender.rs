//! HTTP transmission of measurements to the consumer endpoint
//!
//! Every payload is JSON, tagged with an `X-Data-Type` header naming its
//! shape. HTTP 200 and 202 count as success; anything else is an error and
//! marks the sender unhealthy until the next success.

use reqwest::StatusCode;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{
    EisMeasurement, ImpedanceBatch, ImpedancePoint, ImpedanceSpectrum, SpectrumWithIteration,
};

/// Header carrying the payload kind.
pub const DATA_TYPE_HEADER: &str = "X-Data-Type";

/// Sender errors
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned status {0}")]
    ServerError(StatusCode),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid target URL '{0}'")]
    InvalidUrl(String),
}

/// Payload kinds, as announced in `X-Data-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Array of `{frequency, real, imag}` triples
    Measurement,
    /// Voltage and current half spectra plus impedance
    MeasurementFull,
    /// A single impedance spectrum
    Impedance,
    /// An `ImpedanceBatch` envelope
    Batch,
}

impl DataType {
    pub fn header_value(self) -> &'static str {
        match self {
            DataType::Measurement => "EIS-Measurement",
            DataType::MeasurementFull => "EIS-Measurement-Full",
            DataType::Impedance => "Impedance-Data",
            DataType::Batch => "Impedance-Batch",
        }
    }
}

/// HTTP client for the consumer endpoint.
#[derive(Debug)]
pub struct DataSender {
    http: reqwest::Client,
    target_url: String,
    healthy: AtomicBool,
}

impl DataSender {
    pub fn new(target_url: &str, timeout: Duration) -> Result<Self, SenderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            target_url: target_url.trim().trim_end_matches('/').to_string(),
            healthy: AtomicBool::new(true),
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Outcome of the most recent send (true before the first one).
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// POST impedance triples to the target.
    pub async fn send_points(&self, points: &[ImpedancePoint]) -> Result<(), SenderError> {
        self.post(&self.target_url, DataType::Measurement, points)
            .await?;
        info!(points = points.len(), "Sent EIS measurement");
        Ok(())
    }

    /// POST the full measurement (both half spectra plus impedance).
    pub async fn send_measurement(&self, measurement: &EisMeasurement) -> Result<(), SenderError> {
        self.post(&self.target_url, DataType::MeasurementFull, measurement)
            .await?;
        info!(bins = measurement.impedance.len(), "Sent full EIS measurement");
        Ok(())
    }

    /// POST one impedance spectrum.
    pub async fn send_impedance(&self, spectrum: &ImpedanceSpectrum) -> Result<(), SenderError> {
        self.post(&self.target_url, DataType::Impedance, spectrum)
            .await?;
        info!(
            timestamp = %spectrum.timestamp.format("%H:%M:%S"),
            "Sent impedance data"
        );
        Ok(())
    }

    /// POST spectra as one batch to `<target>/batch`.
    pub async fn send_batch(&self, spectra: &[SpectrumWithIteration]) -> Result<(), SenderError> {
        let batch = ImpedanceBatch::new(spectra.to_vec());
        let url = format!("{}/batch", self.target_url);
        self.post(&url, DataType::Batch, &batch).await?;
        info!(
            batch_id = %batch.batch_id,
            spectra = spectra.len(),
            "Sent impedance batch"
        );
        Ok(())
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data_type: DataType,
        body: &T,
    ) -> Result<(), SenderError> {
        let result = self.try_post(url, data_type, body).await;
        self.healthy.store(result.is_ok(), Ordering::Relaxed);
        result
    }

    async fn try_post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data_type: DataType,
        body: &T,
    ) -> Result<(), SenderError> {
        if url.is_empty() || reqwest::Url::parse(url).is_err() {
            return Err(SenderError::InvalidUrl(url.to_string()));
        }
        let payload = serde_json::to_vec(body)?;
        debug!(url, data_type = data_type.header_value(), bytes = payload.len(), "POST");

        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(DATA_TYPE_HEADER, data_type.header_value())
            .body(payload)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
            status => Err(SenderError::ServerError(status)),
        }
    }
}

/// Pretty-printed JSON with two-space indentation.
pub fn format_as_json<T: Serialize + ?Sized>(data: &T) -> Result<String, SenderError> {
    Ok(serde_json::to_string_pretty(data)?)
}
