//! Application Configuration Module
//!
//! Settings for acquisition, transmission, file output and circuit
//! simulation, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `DEIS_CONFIG` environment variable (path to TOML file)
//! 2. `deis.toml` in the current working directory
//! 3. Built-in defaults (`config::defaults`)
//!
//! The loaded `AppConfig` is passed by value to the components that need it;
//! command-line flags are applied on top by the binaries.

mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::*;
