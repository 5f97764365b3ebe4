//! Shared types, error model, and configuration for oligocalc.
//!
//! This crate is the foundation depended on by all other oligocalc crates.
//! It provides:
//! - [`OligoCalcError`] — the unified error type
//! - Domain types ([`ConcentrationParameters`], [`ThermodynamicResult`], [`ThermoField`])
//! - Configuration ([`AppConfig`], [`ServiceConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, DEFAULT_ENDPOINT, ServiceConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{OligoCalcError, Result};
pub use types::{ConcentrationParameters, RowErrorPolicy, ThermoField, ThermodynamicResult};
