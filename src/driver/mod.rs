mod dry_run_driver;
mod serial_driver;

pub use dry_run_driver::DryRunMotorDriver;
pub use serial_driver::{SerialMotorDriver, WireMotorCommand};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{error::DriverError, mixer::MotorOutput};

#[async_trait]
pub trait MotorDriver: Send + Sync {
    async fn send(&mut self, output: MotorOutput) -> Result<(), DriverError>;
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct MotorConfig {
    /// Motor is mounted reversed, flip the sign of its demand
    #[serde(default)]
    pub inverted: bool,
}

impl MotorConfig {
    pub fn apply(&self, value: f32) -> f32 {
        if self.inverted {
            -value
        } else {
            value
        }
    }
}

fn default_multiplier() -> f32 {
    255.0
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverConfig {
    Serial {
        port: String,
        #[serde(default = "default_multiplier")]
        multiplier: f32,
    },
    DryRun,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig::DryRun
    }
}

/// Motor placement on the chassis
#[derive(Deserialize, Debug, Clone, Default)]
pub struct BodyConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub left: MotorConfig,
    #[serde(default)]
    pub right: MotorConfig,
}

pub async fn motor_driver_from_config(config: BodyConfig) -> Result<Box<dyn MotorDriver>> {
    let driver: Box<dyn MotorDriver> = match &config.driver {
        DriverConfig::Serial { port, multiplier } => Box::new(SerialMotorDriver::new(
            port,
            *multiplier,
            config.left,
            config.right,
        )?),
        DriverConfig::DryRun => Box::new(DryRunMotorDriver::new(config.left, config.right)),
    };
    Ok(driver)
}
