use serde::Deserialize;

use crate::command::DriveCommand;

/// Full scale reading of the joystick ADC.
pub const AXIS_MAX: u16 = 1023;
pub const AXIS_CENTER: u16 = 512;

/// Raw bulk read of the button pins. Pins are pulled up, a cleared bit is
/// a pressed button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonMask(pub u32);

impl ButtonMask {
    pub fn is_pressed(&self, pin: u8) -> bool {
        self.0 & (1 << pin) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickSample {
    pub axis_x: u16,
    pub axis_y: u16,
    pub buttons: ButtonMask,
}

impl JoystickSample {
    pub fn new(axis_x: u16, axis_y: u16, buttons: ButtonMask) -> Self {
        Self {
            axis_x,
            axis_y,
            buttons,
        }
    }

    /// Stick at rest with no buttons held.
    pub fn centered() -> Self {
        Self::new(AXIS_CENTER, AXIS_CENTER, ButtonMask(u32::MAX))
    }
}

/// Readings strictly between `low` and `high` count as centered.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadZone {
    pub low: u16,
    pub high: u16,
}

impl Default for DeadZone {
    fn default() -> Self {
        Self {
            low: 350,
            high: 650,
        }
    }
}

impl DeadZone {
    pub fn map_axis(&self, value: u16) -> f32 {
        if value < self.low {
            -1.0
        } else if value > self.high {
            1.0
        } else {
            0.0
        }
    }
}

/// Turns raw joystick readings into drive commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSampler {
    dead_zone: DeadZone,
}

impl InputSampler {
    pub fn new(dead_zone: DeadZone) -> Self {
        Self { dead_zone }
    }

    pub fn dead_zone(&self) -> DeadZone {
        self.dead_zone
    }

    pub fn map(&self, sample: &JoystickSample) -> DriveCommand {
        // Y reads low when the stick is pushed away from the operator
        DriveCommand {
            throttle: -self.dead_zone.map_axis(sample.axis_y),
            steer: self.dead_zone.map_axis(sample.axis_x),
        }
    }
}
