//! Application configuration - acquisition, network, output and simulation
//! settings as TOML values
//!
//! Each section implements `Default` from `config::defaults`, so a missing
//! file or a missing section behaves exactly like the built-in settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::simulation::CircuitPreset;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "DEIS_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "deis.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AppConfig::load()` which searches:
/// 1. `$DEIS_CONFIG` env var
/// 2. `./deis.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that exists but fails to load is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Check every field and report all violations at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let a = &self.acquisition;

        if !a.sample_rate.is_finite() || a.sample_rate <= 0.0 {
            errors.push(format!(
                "acquisition.sample_rate must be a positive finite number (got {})",
                a.sample_rate
            ));
        } else if a.sample_rate > defaults::MAX_SAMPLE_RATE_HZ {
            errors.push(format!(
                "acquisition.sample_rate {} Hz exceeds the {} Hz limit",
                a.sample_rate,
                defaults::MAX_SAMPLE_RATE_HZ
            ));
        }

        if a.samples_per_cycle == 0 {
            errors.push("acquisition.samples_per_cycle must be > 0".to_string());
        } else if a.samples_per_cycle > defaults::MAX_SAMPLES_PER_CYCLE {
            errors.push(format!(
                "acquisition.samples_per_cycle {} exceeds the {} limit",
                a.samples_per_cycle,
                defaults::MAX_SAMPLES_PER_CYCLE
            ));
        }

        if a.interval_ms == 0 {
            errors.push("acquisition.interval_ms must be > 0".to_string());
        }
        if a.queue_capacity == 0 {
            errors.push("acquisition.queue_capacity must be > 0".to_string());
        }

        let url = self.network.target_url.trim();
        if url.is_empty() {
            errors.push("network.target_url cannot be empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "network.target_url '{url}' must start with http:// or https://"
            ));
        }
        if self.network.timeout_secs == 0 {
            errors.push("network.timeout_secs must be > 0".to_string());
        }

        if self.simulation.batch_size == 0 {
            errors.push("simulation.batch_size must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Acquisition
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sampling rate (Hz)
    pub sample_rate: f64,
    pub samples_per_cycle: usize,
    /// Producer tick period (ms)
    pub interval_ms: u64,
    /// Bound on each of the voltage/current queues
    pub queue_capacity: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE_HZ,
            samples_per_cycle: defaults::SAMPLES_PER_CYCLE,
            interval_ms: defaults::ACQUISITION_INTERVAL_MS,
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub target_url: String,
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            target_url: defaults::TARGET_URL.to_string(),
            timeout_secs: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

// ============================================================================
// Output
// ============================================================================

/// Where finished measurements go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// POST to the target URL
    Http,
    /// One pretty-printed JSON file per measurement
    #[default]
    Console,
    /// One `frequency,real,imag` CSV file per measurement
    Csv,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutputMode::Http => "http",
            OutputMode::Console => "console",
            OutputMode::Csv => "csv",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(OutputMode::Http),
            "console" => Ok(OutputMode::Console),
            "csv" => Ok(OutputMode::Csv),
            other => Err(format!(
                "unknown output mode '{other}' (expected http, console or csv)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            directory: PathBuf::from(defaults::OUTPUT_DIRECTORY),
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub circuit: CircuitPreset,
    pub spectra_count: usize,
    pub batch_size: usize,
    pub max_spectra: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            circuit: CircuitPreset::default(),
            spectra_count: defaults::SPECTRA_COUNT,
            batch_size: defaults::BATCH_SIZE,
            max_spectra: defaults::MAX_SPECTRA,
        }
    }
}
