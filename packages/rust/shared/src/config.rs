//! Application configuration for oligocalc.
//!
//! User config lives at `~/.oligocalc/oligocalc.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OligoCalcError, Result};
use crate::types::{ConcentrationParameters, RowErrorPolicy};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "oligocalc.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".oligocalc";

/// The IDT biophysics melt calculator form handler.
pub const DEFAULT_ENDPOINT: &str = "http://biophysics.idtdna.com/cgi-bin/meltCalculator.cgi";

// ---------------------------------------------------------------------------
// Config structs (matching oligocalc.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote calculator settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Concentrations used by `batch` (primer preset unless overridden).
    #[serde(default = "ConcentrationParameters::primer")]
    pub concentrations: ConcentrationParameters,

    /// Batch file locations and row error policy.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            concentrations: ConcentrationParameters::primer(),
            batch: BatchConfig::default(),
        }
    }
}

/// `[service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Calculator form endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Extra attempts after a transient failure (transport error, 5xx or 429).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubled on each further attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ServiceConfig {
    /// Parse the configured endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).map_err(|e| {
            OligoCalcError::config(format!("invalid endpoint '{}': {e}", self.endpoint))
        })
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

/// `[batch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Input CSV path, relative to the working directory.
    #[serde(default = "default_input")]
    pub input: String,

    /// Output CSV path, relative to the working directory.
    #[serde(default = "default_output")]
    pub output: String,

    /// `abort` or `skip`; skip covers row errors, not file I/O failures.
    #[serde(default)]
    pub on_error: RowErrorPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            on_error: RowErrorPolicy::default(),
        }
    }
}

fn default_input() -> String {
    "ForThermoBLAST.csv".into()
}
fn default_output() -> String {
    "OligoFeatures.csv".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.oligocalc/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OligoCalcError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.oligocalc/oligocalc.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OligoCalcError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        OligoCalcError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OligoCalcError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OligoCalcError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OligoCalcError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
