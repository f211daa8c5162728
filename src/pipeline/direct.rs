//! Direct spectrum generation and impedance-CSV replay
//!
//! Both modes skip the time-domain path: spectra come from the circuit
//! model or from a file and are emitted per output mode.
//!
//! | mode      | direct generation              | CSV replay                 |
//! |-----------|--------------------------------|----------------------------|
//! | `http`    | one batch POST per tick        | one batch POST             |
//! | `console` | one JSON file per spectrum     | one JSON file per spectrum |
//! | `csv`     | generated data file only       | one CSV file per spectrum  |

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::output::OutputWriter;
use crate::acquisition::csv_loader;
use crate::config::OutputMode;
use crate::network::DataSender;
use crate::simulation::{CircuitModelGenerator, CircuitPreset};
use crate::types::SpectrumWithIteration;

/// Header of the generated data file.
pub const GENERATED_CSV_HEADER: &str = "Z_real,Z_imag,Spectrum_Number,Frequency_Hz";

/// Settings for one direct generation run.
#[derive(Debug, Clone)]
pub struct DirectSettings {
    pub circuit: CircuitPreset,
    /// Spectra requested
    pub spectra_count: usize,
    /// Spectra generated per tick
    pub batch_size: usize,
    /// Hard stop regardless of `spectra_count`
    pub max_spectra: usize,
    pub interval: Duration,
    pub mode: OutputMode,
    pub directory: PathBuf,
}

/// Counters reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectStats {
    pub spectra: usize,
    pub batches: usize,
    pub emit_failures: usize,
}

/// Path of the generated data file for a circuit preset.
pub fn generated_csv_path(directory: &Path, circuit: CircuitPreset) -> PathBuf {
    directory.join(format!("generated_eis_data_{circuit}.csv"))
}

/// Rows `Z_real,Z_imag,Spectrum_Number,Frequency_Hz` in `%.12e` notation.
pub fn generated_csv_rows(item: &SpectrumWithIteration) -> String {
    let mut out = String::new();
    for (z, f) in item
        .spectrum
        .impedance
        .iter()
        .zip(item.spectrum.frequencies.iter())
    {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            format_exp12(z.re),
            format_exp12(z.im),
            item.iteration,
            format_exp12(*f)
        );
    }
    out
}

/// `%.12e`: twelve fraction digits, signed two-digit exponent.
fn format_exp12(x: f64) -> String {
    let s = format!("{:.12e}", x);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

/// Emits spectra according to the output mode.
struct Emitter {
    mode: OutputMode,
    writer: OutputWriter,
    sender: Arc<DataSender>,
}

impl Emitter {
    async fn emit(&self, batch: &[SpectrumWithIteration], csv_files: bool) -> Result<()> {
        match self.mode {
            OutputMode::Http => {
                self.sender.send_batch(batch).await?;
            }
            OutputMode::Console => {
                for item in batch {
                    self.writer.write_json(&item.spectrum.to_points()).await?;
                }
            }
            OutputMode::Csv if csv_files => {
                for item in batch {
                    self.writer.write_points_csv(&item.spectrum.to_points()).await?;
                }
            }
            OutputMode::Csv => {}
        }
        Ok(())
    }
}

/// Circuit-model generation loop.
pub struct DirectGenerator {
    settings: DirectSettings,
    generator: CircuitModelGenerator,
    emitter: Emitter,
    cancel_token: CancellationToken,
}

impl DirectGenerator {
    pub fn new(
        settings: DirectSettings,
        sender: Arc<DataSender>,
        cancel_token: CancellationToken,
    ) -> Self {
        let emitter = Emitter {
            mode: settings.mode,
            writer: OutputWriter::new(&settings.directory),
            sender,
        };
        Self {
            settings,
            generator: CircuitModelGenerator::new(),
            emitter,
            cancel_token,
        }
    }

    /// Generate batches until done, capped, or cancelled.
    ///
    /// Failing to create the data file is fatal; emit failures are logged
    /// and counted.
    pub async fn run(mut self) -> Result<DirectStats> {
        let params = self.settings.circuit.parameters();
        let target = self.settings.spectra_count.min(self.settings.max_spectra);
        let batch_size = self.settings.batch_size.max(1);
        let mut stats = DirectStats::default();

        info!(
            circuit = %self.settings.circuit,
            spectra = self.settings.spectra_count,
            rs = params.rs,
            rct_initial = params.rct_initial,
            q = params.q,
            n = params.n,
            "Starting direct EIS generation"
        );

        tokio::fs::create_dir_all(&self.settings.directory)
            .await
            .with_context(|| format!("Failed to create {}", self.settings.directory.display()))?;
        let path = generated_csv_path(&self.settings.directory, self.settings.circuit);
        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        file.write_all(format!("{GENERATED_CSV_HEADER}\n").as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Created output file");

        let mut ticker = interval_at(
            Instant::now() + self.settings.interval,
            self.settings.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Direct EIS generator stopping due to cancellation");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let mut batch = Vec::with_capacity(batch_size);
            let mut rows = String::new();
            while batch.len() < batch_size && self.generator.current_spectrum() < target {
                let iteration = self.generator.current_spectrum();
                let item = SpectrumWithIteration {
                    spectrum: self.generator.generate_spectrum(&params),
                    iteration,
                };
                rows.push_str(&generated_csv_rows(&item));
                batch.push(item);
            }

            if batch.is_empty() {
                info!(spectra = stats.spectra, "Generated all requested spectra, stopping");
                break;
            }

            file.write_all(rows.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("Failed to flush {}", path.display()))?;
            file.sync_data()
                .await
                .with_context(|| format!("Failed to sync {}", path.display()))?;

            stats.spectra += batch.len();
            stats.batches += 1;
            info!(
                spectra = batch.len(),
                first = batch[0].iteration,
                last = batch[batch.len() - 1].iteration,
                "Generated batch"
            );

            if let Err(e) = self.emitter.emit(&batch, false).await {
                stats.emit_failures += 1;
                warn!(mode = %self.settings.mode, error = %e, "Failed to emit batch");
            }

            if self.generator.current_spectrum() >= self.settings.max_spectra {
                info!(max = self.settings.max_spectra, "Reached spectrum limit, stopping");
                break;
            }
        }

        file.flush()
            .await
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(stats)
    }
}

/// Load an impedance CSV and emit every spectrum once.
///
/// Returns the number of spectra loaded.
pub async fn replay_impedance_csv(
    path: &Path,
    mode: OutputMode,
    directory: &Path,
    sender: Arc<DataSender>,
) -> Result<usize> {
    let spectra = csv_loader::load_impedance_csv(path)
        .with_context(|| format!("Failed to load impedance data from {}", path.display()))?;
    let emitter = Emitter {
        mode,
        writer: OutputWriter::new(directory),
        sender,
    };

    info!(spectra = spectra.len(), mode = %mode, "Emitting impedance spectra");
    emitter.emit(&spectra, true).await?;
    info!("Impedance CSV processing completed");
    Ok(spectra.len())
}
