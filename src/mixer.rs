use serde::Serialize;

/// Normalized drive demand for the two sides of the car.
///
/// Values are always within `[-1.0, 1.0]`, `0.0` is neutral.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Default)]
pub struct MotorOutput {
    left: f32,
    right: f32,
}

impl MotorOutput {
    pub fn new(left: f32, right: f32) -> Self {
        Self {
            left: left.clamp(-1.0, 1.0),
            right: right.clamp(-1.0, 1.0),
        }
    }

    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn is_neutral(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

/// Tank style differential mixing.
///
/// Each side saturates on its own. The pair is not rescaled to keep the
/// turn ratio, so `mix(1.0, 1.0)` is `(1.0, 0.0)`.
pub fn mix(throttle: f32, steer: f32) -> MotorOutput {
    MotorOutput::new(throttle + steer, throttle - steer)
}
