//! System-wide default constants.
//!
//! Grouped by subsystem. `AppConfig::default()` is built from these.

// ============================================================================
// Acquisition
// ============================================================================

/// Default sampling rate (Hz).
pub const SAMPLE_RATE_HZ: f64 = 1000.0;

/// Samples collected per acquisition cycle.
pub const SAMPLES_PER_CYCLE: usize = 1000;

/// Period of the acquisition tick (milliseconds).
pub const ACQUISITION_INTERVAL_MS: u64 = 1000;

/// Capacity of each of the voltage/current queues.
///
/// Items produced while a queue is full are dropped.
pub const QUEUE_CAPACITY: usize = 10;

/// Upper bound on the configured sampling rate (Hz). 1 MHz.
pub const MAX_SAMPLE_RATE_HZ: f64 = 1_000_000.0;

/// Upper bound on samples per cycle.
pub const MAX_SAMPLES_PER_CYCLE: usize = 100_000;

// ============================================================================
// Network
// ============================================================================

/// Endpoint that receives impedance triples.
pub const TARGET_URL: &str = "http://localhost:8080/eis-data";

/// HTTP client timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Output
// ============================================================================

/// Root directory for JSON/CSV file output.
pub const OUTPUT_DIRECTORY: &str = "output";

// ============================================================================
// Direct Circuit Simulation
// ============================================================================

/// Spectra to generate in direct mode.
pub const SPECTRA_COUNT: usize = 5;

/// Spectra generated per tick in direct mode.
pub const BATCH_SIZE: usize = 10;

/// Hard stop for the direct generator regardless of the requested count.
pub const MAX_SPECTRA: usize = 100;

/// Frequency points per synthesized spectrum.
pub const POINTS_PER_SPECTRUM: usize = 50;

/// Highest synthesized frequency (Hz).
pub const MAX_FREQUENCY_HZ: f64 = 1e5;

/// Lowest synthesized frequency (Hz).
pub const MIN_FREQUENCY_HZ: f64 = 1e-2;

// ============================================================================
// Consumer Server
// ============================================================================

/// Bind address for `deis-consumer`.
pub const CONSUMER_ADDR: &str = "0.0.0.0:8080";
