//! Bootstrap configuration loading and config file resolution
//!
//! Configuration is read once at process start and never changes while the
//! process runs. Every key is optional; compiled defaults fill the gaps.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`~/.config/sentinel/config.toml`)
//! 4. System config file (`/etc/sentinel/config.toml`)
//!
//! When no file is found the compiled defaults are used and startup continues.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SENTINEL_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Channel capacities, pool sizes and dispatch ceiling
    pub pipeline: PipelineSection,
    /// Simulated analysis and persistence costs
    pub analysis: AnalysisSection,
    /// Alert cooldown and delivery settings
    pub alerts: AlertsSection,
    /// Simulated data generators
    pub simulation: SimulationSection,
    /// Observer fan-out settings
    pub broadcast: BroadcastSection,
    /// HTTP presentation surface
    pub http: HttpSection,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    /// Worker threads in the CPU analysis pool
    pub cpu_workers: usize,
    /// Concurrent blocking jobs in the I/O pool
    pub io_workers: usize,
    /// Capacity of each per-domain raw input channel
    pub input_channel_capacity: usize,
    /// Capacity of the shared normalized-record channel
    pub processing_channel_capacity: usize,
    /// Capacity of the outbound event channel
    pub event_channel_capacity: usize,
    /// Ceiling on concurrently in-flight dispatch tasks
    pub max_in_flight_dispatch: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            cpu_workers: 4,
            io_workers: 10,
            input_channel_capacity: 100,
            processing_channel_capacity: 300,
            event_channel_capacity: 1000,
            max_in_flight_dispatch: 256,
        }
    }
}

/// `[analysis]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSection {
    /// Simulated CPU time for one genetic analysis
    pub genetic_work_ms: u64,
    /// Simulated CPU time for one biochemical analysis
    pub biochemical_work_ms: u64,
    /// Simulated database latency when saving an analysis result
    pub result_save_delay_ms: u64,
    /// Simulated blocking latency when writing a vitals record
    pub vitals_save_delay_ms: u64,
    /// Optional JSON-lines file receiving every vitals record
    pub vitals_log_path: Option<PathBuf>,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            genetic_work_ms: 2000,
            biochemical_work_ms: 1500,
            result_save_delay_ms: 500,
            vitals_save_delay_ms: 500,
            vitals_log_path: None,
        }
    }
}

/// `[alerts]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertsSection {
    /// Minimum seconds between two alerts with the same key
    pub cooldown_secs: u64,
    /// Upper bound on waiting for room in the event channel
    pub send_timeout_ms: u64,
    /// Simulated network latency after an alert is pushed
    pub delivery_delay_ms: u64,
    /// Cooldown map size that triggers a sweep
    pub max_cooldown_entries: usize,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            cooldown_secs: 60,
            send_timeout_ms: 1000,
            delivery_delay_ms: 100,
            max_cooldown_entries: 10_000,
        }
    }
}

/// `[simulation]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSection {
    /// Run the simulated data feeds
    pub enabled: bool,
    /// Feed speed multiplier (2.0 = twice as fast)
    pub speed: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 1.0,
        }
    }
}

/// `[broadcast]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BroadcastSection {
    /// Per-observer message buffer
    pub observer_buffer: usize,
}

impl Default for BroadcastSection {
    fn default() -> Self {
        Self { observer_buffer: 64 }
    }
}

/// `[http]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpSection {
    /// Socket address the HTTP server binds to
    pub bind: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file and load it, falling back to defaults
    ///
    /// A missing file is not an error. A file that exists but cannot be
    /// parsed is reported, since silently ignoring it would hide operator
    /// mistakes.
    pub fn resolve_and_load(cli_arg: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                warn!("No configuration file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the config file following the documented priority order
///
/// Explicit paths (CLI, environment) are returned even if they do not exist
/// so that the subsequent load reports the missing file.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3 and 4: well-known locations
    default_config_locations()
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Well-known config file locations, highest priority first
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("sentinel").join("config.toml"));
    }
    if cfg!(unix) {
        locations.push(PathBuf::from("/etc/sentinel/config.toml"));
    }
    locations
}
