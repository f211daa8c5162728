//! deis - Dynamic Electrochemical Impedance Spectroscopy processor
//!
//! Turns paired voltage/current sample windows into impedance spectra and
//! delivers them over HTTP or to JSON/CSV files.
//!
//! # Usage
//!
//! ```bash
//! # Synthetic signals, one JSON file per measurement under ./output/json
//! deis
//!
//! # Replay sample CSV files and post results to a consumer
//! deis --file --voltage data/voltage_10s.csv --current data/current_10s.csv \
//!      --output http --target http://localhost:8080/eis-data
//!
//! # Circuit-model spectra without the transform path
//! deis --direct --circuit medium --spectra 20
//!
//! # Emit spectra from an impedance CSV
//! deis --impedance-csv generated_eis_data_simple.csv --output csv
//! ```
//!
//! # Environment Variables
//!
//! - `DEIS_CONFIG`: Path to a TOML config (default search: `./deis.toml`)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use deis::acquisition::{FileSource, Receiver, ReceiverStats, SignalSource, SyntheticSource};
use deis::config::{AppConfig, OutputMode};
use deis::network::DataSender;
use deis::pipeline::{
    replay_impedance_csv, sink_for_mode, DirectGenerator, DirectSettings, LoopStats,
    ProcessingLoop,
};
use deis::processing::{DefaultCalculator, DefaultValidator};
use deis::simulation::CircuitPreset;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "deis")]
#[command(about = "Dynamic EIS processor: voltage/current samples to impedance spectra")]
#[command(version)]
struct CliArgs {
    /// TOML configuration file (overrides DEIS_CONFIG and ./deis.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Target URL for HTTP output
    #[arg(long)]
    target: Option<String>,

    /// Sample rate in Hz
    #[arg(long)]
    rate: Option<f64>,

    /// Samples per acquisition cycle
    #[arg(long)]
    samples: Option<usize>,

    /// Acquisition tick period in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Read voltage/current samples from CSV files instead of synthesizing them
    #[arg(long)]
    file: bool,

    /// Voltage samples CSV (with --file)
    #[arg(long, default_value = "data/voltage_10s.csv")]
    voltage: PathBuf,

    /// Current samples CSV (with --file)
    #[arg(long, default_value = "data/current_10s.csv")]
    current: PathBuf,

    /// Output mode: http, console (JSON files) or csv
    #[arg(long)]
    output: Option<OutputMode>,

    /// Root directory for file output
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Generate spectra from a circuit model instead of the transform path
    #[arg(long)]
    direct: bool,

    /// Circuit preset for --direct: simple, medium or complex
    #[arg(long)]
    circuit: Option<CircuitPreset>,

    /// Spectra to generate with --direct
    #[arg(long)]
    spectra: Option<usize>,

    /// Emit spectra from an impedance CSV (Frequency_Hz,Z_real,Z_imag,Spectrum_Number)
    #[arg(long, value_name = "PATH")]
    impedance_csv: Option<PathBuf>,
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load(),
    };
    apply_overrides(&mut config, args);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// CLI flags take precedence over file values.
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(target) = &args.target {
        config.network.target_url = target.clone();
    }
    if let Some(rate) = args.rate {
        config.acquisition.sample_rate = rate;
    }
    if let Some(samples) = args.samples {
        config.acquisition.samples_per_cycle = samples;
    }
    if let Some(ms) = args.interval_ms {
        config.acquisition.interval_ms = ms;
    }
    if let Some(mode) = args.output {
        config.output.mode = mode;
    }
    if let Some(dir) = &args.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(circuit) = args.circuit {
        config.simulation.circuit = circuit;
    }
    if let Some(spectra) = args.spectra {
        config.simulation.spectra_count = spectra;
    }
}

// ============================================================================
// Modes
// ============================================================================

/// Result of one supervised streaming task.
enum TaskOutcome {
    Receiver(ReceiverStats),
    Processor(LoopStats),
}

/// Producer and consumer tasks joined by the bounded queues.
async fn run_streaming<S: SignalSource>(
    mut source: S,
    config: &AppConfig,
    sender: Arc<DataSender>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let (receiver, queues) = Receiver::new(
        config.acquisition.queue_capacity,
        Duration::from_millis(config.acquisition.interval_ms),
        Arc::new(DefaultValidator::new()),
        cancel_token.clone(),
    );
    let sink = sink_for_mode(config.output.mode, &config.output.directory, sender);
    let processor = ProcessingLoop::new(
        Arc::new(DefaultCalculator::default()),
        sink,
        cancel_token.clone(),
    );

    let mut task_set: JoinSet<TaskOutcome> = JoinSet::new();
    task_set.spawn(async move { TaskOutcome::Receiver(receiver.run(&mut source).await) });
    task_set.spawn(async move { TaskOutcome::Processor(processor.run(queues).await) });

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(TaskOutcome::Receiver(stats)) => info!(
                produced = stats.produced,
                dropped_voltage = stats.dropped_voltage,
                dropped_current = stats.dropped_current,
                invalid = stats.invalid,
                "Receiver finished"
            ),
            Ok(TaskOutcome::Processor(stats)) => info!(
                cycles = stats.cycles,
                processed = stats.processed,
                unpaired = stats.unpaired,
                failed = stats.failed,
                sink_failures = stats.sink_failures,
                "Processor finished"
            ),
            Err(e) => {
                error!(error = %e, "Pipeline task panicked");
                cancel_token.cancel();
                return Err(anyhow::anyhow!("Pipeline task panicked: {}", e));
            }
        }
    }
    Ok(())
}

async fn run_direct(
    config: &AppConfig,
    sender: Arc<DataSender>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let settings = DirectSettings {
        circuit: config.simulation.circuit,
        spectra_count: config.simulation.spectra_count,
        batch_size: config.simulation.batch_size,
        max_spectra: config.simulation.max_spectra,
        interval: Duration::from_millis(config.acquisition.interval_ms),
        mode: config.output.mode,
        directory: config.output.directory.clone(),
    };
    let stats = DirectGenerator::new(settings, sender, cancel_token).run().await?;
    info!(
        spectra = stats.spectra,
        batches = stats.batches,
        emit_failures = stats.emit_failures,
        "Direct generation finished"
    );
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    info!(
        sample_rate = config.acquisition.sample_rate,
        samples = config.acquisition.samples_per_cycle,
        interval_ms = config.acquisition.interval_ms,
        output = %config.output.mode,
        "Starting EIS processor"
    );
    if config.output.mode == OutputMode::Http {
        info!(target = %config.network.target_url, "Sending data over HTTP");
    } else {
        info!(directory = %config.output.directory.display(), "Writing output files");
    }

    let sender = Arc::new(
        DataSender::new(
            &config.network.target_url,
            Duration::from_secs(config.network.timeout_secs),
        )
        .context("Failed to create HTTP client")?,
    );

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating shutdown...");
                shutdown_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    if let Some(path) = &args.impedance_csv {
        info!(path = %path.display(), "Input: impedance CSV");
        let count = replay_impedance_csv(
            path,
            config.output.mode,
            &config.output.directory,
            sender,
        )
        .await?;
        info!(spectra = count, "Impedance CSV emitted");
    } else if args.direct {
        info!(circuit = %config.simulation.circuit, "Input: direct circuit model");
        run_direct(&config, sender, cancel_token).await?;
    } else if args.file {
        info!(
            voltage = %args.voltage.display(),
            current = %args.current.display(),
            "Input: sample CSV files"
        );
        let source = FileSource::from_files(
            &args.voltage,
            &args.current,
            config.acquisition.sample_rate,
            config.acquisition.samples_per_cycle,
        )
        .context("Failed to load sample files")?;
        run_streaming(source, &config, sender, cancel_token).await?;
    } else {
        info!("Input: synthetic signals");
        let source = SyntheticSource::new(
            config.acquisition.sample_rate,
            config.acquisition.samples_per_cycle,
        );
        run_streaming(source, &config, sender, cancel_token).await?;
    }

    info!("EIS processor shutdown complete");
    Ok(())
}
