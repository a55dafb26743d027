use config::Config;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use tracing::*;

use crate::{driver::BodyConfig, error::ErrorWrapper, sampler::DeadZone, sensor::SensorConfig};

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub zenoh: RcZenohConfig,
}

impl AppConfig {
    pub fn load_config(config: &Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = if let Some(config) = config {
            info!("Using configuration from {:?}", config);
            Config::builder()
                .add_source(environment_source())
                .add_source(config::File::with_name(
                    config
                        .to_str()
                        .ok_or_else(|| anyhow::anyhow!("Failed to convert path"))?,
                ))
                .build()?
        } else {
            info!("Using dev configuration");
            Config::builder()
                .add_source(environment_source())
                .add_source(config::File::with_name("config/settings"))
                .add_source(config::File::with_name("config/dev_settings").required(false))
                .build()?
        };

        Ok(settings.try_deserialize()?)
    }
}

/// `APP_VEHICLE__STALENESS_TIMEOUT_MS=250` style overrides
fn environment_source() -> config::Environment {
    config::Environment::with_prefix("APP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn default_topic() -> String {
    String::from("rc/drive")
}

fn default_sample_period_ms() -> u64 {
    40
}

fn default_evaluation_period_ms() -> u64 {
    10
}

fn default_staleness_timeout_ms() -> u64 {
    500
}

#[derive(Deserialize, Debug, Clone)]
pub struct ControllerConfig {
    /// Sampling and publish period
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,
    #[serde(default)]
    pub dead_zone: DeadZone,
    #[serde(default)]
    pub sensor: SensorConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period_ms(),
            dead_zone: DeadZone::default(),
            sensor: SensorConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct VehicleConfig {
    /// How often the watchdog runs and motors are updated
    #[serde(default = "default_evaluation_period_ms")]
    pub evaluation_period_ms: u64,
    #[serde(default = "default_staleness_timeout_ms")]
    pub staleness_timeout_ms: u64,
    #[serde(default)]
    pub body: BodyConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            evaluation_period_ms: default_evaluation_period_ms(),
            staleness_timeout_ms: default_staleness_timeout_ms(),
            body: BodyConfig::default(),
        }
    }
}

impl VehicleConfig {
    pub fn evaluation_period(&self) -> Duration {
        Duration::from_millis(self.evaluation_period_ms)
    }

    pub fn staleness_timeout(&self) -> Duration {
        Duration::from_millis(self.staleness_timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RcZenohConfig {
    #[serde(default)]
    pub connect: Vec<zenoh_config::EndPoint>,
    #[serde(default)]
    pub listen: Vec<zenoh_config::EndPoint>,
    #[serde(default)]
    pub config_path: Option<String>,
}

impl RcZenohConfig {
    /// Session config: the optional zenoh config file, then any endpoints
    /// listed here on top of it.
    pub fn session_config(&self) -> anyhow::Result<zenoh::config::Config> {
        let mut session_config = match &self.config_path {
            Some(path) => {
                info!(path, "Loading zenoh config file");
                zenoh::config::Config::from_file(path).map_err(ErrorWrapper::ZenohError)?
            }
            None => zenoh::config::Config::default(),
        };
        if !self.connect.is_empty() {
            session_config.connect.endpoints = self.connect.clone();
        }
        if !self.listen.is_empty() {
            session_config.listen.endpoints = self.listen.clone();
        }
        Ok(session_config)
    }
}
