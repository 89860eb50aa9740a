//! Runtime pipeline configuration
//!
//! Built once from the bootstrap [`TomlConfig`] (after CLI overrides) and
//! held immutable for the life of the process.

use crate::alerting::AlertSettings;
use crate::processing::OrchestratorSettings;
use sentinel_common::config::TomlConfig;
use sentinel_common::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Validated runtime settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cpu_workers: usize,
    pub io_workers: usize,
    pub input_channel_capacity: usize,
    pub processing_channel_capacity: usize,
    pub event_channel_capacity: usize,
    pub max_in_flight_dispatch: usize,

    pub genetic_work: Duration,
    pub biochemical_work: Duration,
    pub result_save_delay: Duration,
    pub vitals_save_delay: Duration,
    pub vitals_log_path: Option<PathBuf>,

    pub alerts: AlertSettings,

    pub simulation_enabled: bool,
    pub simulation_speed: f64,

    pub observer_buffer: usize,
    pub bind: SocketAddr,
}

impl PipelineConfig {
    /// Convert and validate a bootstrap config
    pub fn from_toml(toml: &TomlConfig) -> Result<Self> {
        let bind = toml.http.bind.parse::<SocketAddr>().map_err(|e| {
            Error::Config(format!("invalid http.bind '{}': {}", toml.http.bind, e))
        })?;

        let config = Self {
            cpu_workers: toml.pipeline.cpu_workers,
            io_workers: toml.pipeline.io_workers,
            input_channel_capacity: toml.pipeline.input_channel_capacity,
            processing_channel_capacity: toml.pipeline.processing_channel_capacity,
            event_channel_capacity: toml.pipeline.event_channel_capacity,
            max_in_flight_dispatch: toml.pipeline.max_in_flight_dispatch,

            genetic_work: Duration::from_millis(toml.analysis.genetic_work_ms),
            biochemical_work: Duration::from_millis(toml.analysis.biochemical_work_ms),
            result_save_delay: Duration::from_millis(toml.analysis.result_save_delay_ms),
            vitals_save_delay: Duration::from_millis(toml.analysis.vitals_save_delay_ms),
            vitals_log_path: toml.analysis.vitals_log_path.clone(),

            alerts: AlertSettings {
                cooldown: Duration::from_secs(toml.alerts.cooldown_secs),
                send_timeout: Duration::from_millis(toml.alerts.send_timeout_ms),
                delivery_delay: Duration::from_millis(toml.alerts.delivery_delay_ms),
                max_cooldown_entries: toml.alerts.max_cooldown_entries,
            },

            simulation_enabled: toml.simulation.enabled,
            simulation_speed: toml.simulation.speed,

            observer_buffer: toml.broadcast.observer_buffer,
            bind,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would deadlock or divide by zero
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pipeline.cpu_workers", self.cpu_workers),
            ("pipeline.io_workers", self.io_workers),
            ("pipeline.input_channel_capacity", self.input_channel_capacity),
            ("pipeline.processing_channel_capacity", self.processing_channel_capacity),
            ("pipeline.event_channel_capacity", self.event_channel_capacity),
            ("pipeline.max_in_flight_dispatch", self.max_in_flight_dispatch),
            ("alerts.max_cooldown_entries", self.alerts.max_cooldown_entries),
            ("broadcast.observer_buffer", self.observer_buffer),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than 0", key)));
            }
        }

        if !(self.simulation_speed.is_finite() && self.simulation_speed > 0.0) {
            return Err(Error::Config(format!(
                "simulation.speed must be a positive number, got {}",
                self.simulation_speed
            )));
        }

        Ok(())
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            genetic_work: self.genetic_work,
            biochemical_work: self.biochemical_work,
            max_in_flight: self.max_in_flight_dispatch,
            event_timeout: self.alerts.send_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_convert() {
        let config = PipelineConfig::from_toml(&TomlConfig::default()).expect("defaults are valid");

        assert_eq!(config.cpu_workers, 4);
        assert_eq!(config.io_workers, 10);
        assert_eq!(config.genetic_work, Duration::from_secs(2));
        assert_eq!(config.alerts.cooldown, Duration::from_secs(60));
        assert_eq!(config.alerts.delivery_delay, Duration::from_millis(100));
        assert_eq!(config.bind, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut toml = TomlConfig::default();
        toml.pipeline.processing_channel_capacity = 0;

        let err = PipelineConfig::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("pipeline.processing_channel_capacity"));
    }

    #[test]
    fn test_non_positive_speed_rejected() {
        let mut toml = TomlConfig::default();
        toml.simulation.speed = 0.0;
        assert!(PipelineConfig::from_toml(&toml).is_err());

        toml.simulation.speed = f64::NAN;
        assert!(PipelineConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn test_bad_bind_address_rejected() {
        let mut toml = TomlConfig::default();
        toml.http.bind = "localhost".to_string();
        assert!(matches!(PipelineConfig::from_toml(&toml), Err(Error::Config(_))));
    }
}
