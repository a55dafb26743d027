mod serial_joystick;

pub use serial_joystick::{BridgeJoystick, JoystickBridgeProtocol, SerialJoystick};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::SensorError,
    sampler::{ButtonMask, JoystickSample, AXIS_CENTER},
};

/// Polled joystick hardware.
#[async_trait]
pub trait JoystickSensor: Send {
    async fn read(&mut self) -> Result<JoystickSample, SensorError>;
}

/// Always reports the same reading.
pub struct FixedJoystick {
    sample: JoystickSample,
}

impl FixedJoystick {
    pub fn new(sample: JoystickSample) -> Self {
        Self { sample }
    }
}

#[async_trait]
impl JoystickSensor for FixedJoystick {
    async fn read(&mut self) -> Result<JoystickSample, SensorError> {
        Ok(self.sample)
    }
}

fn default_axis() -> u16 {
    AXIS_CENTER
}

fn default_buttons() -> u32 {
    u32::MAX
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorConfig {
    Serial {
        port: String,
    },
    Fixed {
        #[serde(default = "default_axis")]
        x: u16,
        #[serde(default = "default_axis")]
        y: u16,
        #[serde(default = "default_buttons")]
        buttons: u32,
    },
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig::Fixed {
            x: AXIS_CENTER,
            y: AXIS_CENTER,
            buttons: u32::MAX,
        }
    }
}

pub fn joystick_from_config(config: &SensorConfig) -> Result<Box<dyn JoystickSensor>> {
    let sensor: Box<dyn JoystickSensor> = match config {
        SensorConfig::Serial { port } => Box::new(SerialJoystick::open(port)?),
        SensorConfig::Fixed { x, y, buttons } => Box::new(FixedJoystick::new(
            JoystickSample::new(*x, *y, ButtonMask(*buttons)),
        )),
    };
    Ok(sensor)
}
