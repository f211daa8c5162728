//! Measurement sinks: HTTP, JSON files and CSV files
//!
//! File output goes to `<root>/json/` and `<root>/csv/` as
//! `eis_measurement_<YYYYmmdd_HHMMSS>_<NNN>.<ext>`, where `NNN` counts the
//! files written by one writer, starting at 1.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::config::OutputMode;
use crate::network::DataSender;
use crate::types::{EisMeasurement, ImpedancePoint};

/// Destination for finished measurements.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    async fn deliver(&self, measurement: &EisMeasurement) -> Result<()>;

    /// Human-readable name for logging.
    fn sink_name(&self) -> &str;

    /// False after a failed delivery that is likely to repeat.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Sink for the configured output mode.
pub fn sink_for_mode(
    mode: OutputMode,
    directory: &Path,
    sender: Arc<DataSender>,
) -> Box<dyn MeasurementSink> {
    match mode {
        OutputMode::Http => Box::new(HttpSink::new(sender)),
        OutputMode::Console => Box::new(JsonFileSink::new(OutputWriter::new(directory))),
        OutputMode::Csv => Box::new(CsvFileSink::new(OutputWriter::new(directory))),
    }
}

// ============================================================================
// File Writer
// ============================================================================

/// Numbered JSON/CSV files under one output root.
#[derive(Debug)]
pub struct OutputWriter {
    root: PathBuf,
    counter: AtomicUsize,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: AtomicUsize::new(0),
        }
    }

    /// Files written so far.
    pub fn written(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    /// Pretty-printed JSON into `<root>/json/`.
    pub async fn write_json<T: Serialize + ?Sized + Sync>(&self, value: &T) -> Result<PathBuf> {
        let contents = serde_json::to_string_pretty(value).context("Failed to serialize measurement")?;
        let path = self.write("json", contents).await?;
        info!(path = %path.display(), "EIS measurement saved");
        Ok(path)
    }

    /// `frequency,real,imag` rows into `<root>/csv/`.
    pub async fn write_points_csv(&self, points: &[ImpedancePoint]) -> Result<PathBuf> {
        let path = self.write("csv", points_to_csv(points)).await?;
        info!(path = %path.display(), "EIS measurement CSV saved");
        Ok(path)
    }

    async fn write(&self, kind: &str, contents: String) -> Result<PathBuf> {
        let dir = self.root.join(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let name = format!(
            "eis_measurement_{}_{:03}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            n,
            kind
        );
        let path = dir.join(name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// CSV body with a `frequency,real,imag` header.
pub fn points_to_csv(points: &[ImpedancePoint]) -> String {
    let mut out = String::from("frequency,real,imag\n");
    for p in points {
        let _ = writeln!(
            out,
            "{},{:.6},{:.6}",
            format_general(p.frequency),
            p.real,
            p.imag
        );
    }
    out
}

/// Six significant digits, `%g` style: fixed notation for exponents in
/// `[-4, 6)`, scientific otherwise, trailing zeros removed.
pub fn format_general(x: f64) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return x.to_string();
    }

    // Rounding to six digits first fixes the exponent (999999.5 -> 1e+06)
    let sci = format!("{:.5e}", x);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if (-4..6).contains(&exp) {
        let decimals = (5 - exp) as usize;
        trim_fraction(&format!("{:.*}", decimals, x)).to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Posts impedance triples through the shared sender.
pub struct HttpSink {
    sender: Arc<DataSender>,
}

impl HttpSink {
    pub fn new(sender: Arc<DataSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl MeasurementSink for HttpSink {
    async fn deliver(&self, measurement: &EisMeasurement) -> Result<()> {
        self.sender.send_points(&measurement.points()).await?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "http"
    }

    fn is_healthy(&self) -> bool {
        self.sender.is_healthy()
    }
}

/// One pretty-printed `EisMeasurement` JSON file per delivery.
pub struct JsonFileSink {
    writer: OutputWriter,
}

impl JsonFileSink {
    pub fn new(writer: OutputWriter) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl MeasurementSink for JsonFileSink {
    async fn deliver(&self, measurement: &EisMeasurement) -> Result<()> {
        self.writer.write_json(measurement).await?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "json"
    }
}

/// One `frequency,real,imag` CSV file per delivery.
pub struct CsvFileSink {
    writer: OutputWriter,
}

impl CsvFileSink {
    pub fn new(writer: OutputWriter) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl MeasurementSink for CsvFileSink {
    async fn deliver(&self, measurement: &EisMeasurement) -> Result<()> {
        self.writer.write_points_csv(&measurement.points()).await?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "csv"
    }
}
