//! deis-consumer - reference receiver for impedance data
//!
//! ```bash
//! deis-consumer --addr 127.0.0.1:8080
//! deis --output http --target http://127.0.0.1:8080/eis-data
//! ```
//!
//! `RUST_LOG` controls verbosity (default: info).

use anyhow::{Context, Result};
use clap::Parser;
use deis::api::{create_app, ConsumerState};
use deis::config::defaults;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "deis-consumer", about = "EIS data consumer server")]
#[command(version)]
struct CliArgs {
    /// Bind address
    #[arg(long, short, env = "DEIS_CONSUMER_ADDR", default_value = defaults::CONSUMER_ADDR)]
    addr: String,
}

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

    let state = ConsumerState::new();
    let app = create_app(state.clone());
    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    info!(address = %args.addr, "EIS consumer listening");
    info!("POST impedance triples to /eis-data, batches to /eis-data/batch");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Consumer server error")?;

    info!(
        received_measurements = state.received_measurements(),
        received_spectra = state.received_spectra(),
        "Consumer shut down gracefully"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
