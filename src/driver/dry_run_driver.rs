use super::{MotorConfig, MotorDriver};
use crate::{error::DriverError, mixer::MotorOutput};
use async_trait::async_trait;
use tracing::*;

/// Stand-in for the motor board when running without hardware.
pub struct DryRunMotorDriver {
    left: MotorConfig,
    right: MotorConfig,
    last: Option<(f32, f32)>,
}

impl DryRunMotorDriver {
    pub fn new(left: MotorConfig, right: MotorConfig) -> Self {
        Self {
            left,
            right,
            last: None,
        }
    }
}

#[async_trait]
impl MotorDriver for DryRunMotorDriver {
    async fn send(&mut self, output: MotorOutput) -> Result<(), DriverError> {
        let demand = (self.left.apply(output.left()), self.right.apply(output.right()));
        if self.last != Some(demand) {
            info!(left = demand.0, right = demand.1, "Motor demand");
            self.last = Some(demand);
        }
        Ok(())
    }
}
