use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Throttle/steer pair sent from the controller to the car.
///
/// Both values are in `[-1.0, 1.0]` when produced by the controller.
/// Received values are untrusted and may be out of range, range
/// enforcement happens in [`crate::mixer::mix`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct DriveCommand {
    pub throttle: f32,
    pub steer: f32,
}

impl DriveCommand {
    pub fn new(throttle: f32, steer: f32) -> Self {
        Self { throttle, steer }
    }

    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn to_payload(&self) -> Vec<u8> {
        // two plain f32 fields can't fail to serialize
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, CommandError> {
        let command: DriveCommand = serde_json::from_slice(payload)?;
        if !command.throttle.is_finite() {
            return Err(CommandError::NonFinite("throttle"));
        }
        if !command.steer.is_finite() {
            return Err(CommandError::NonFinite("steer"));
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_has_only_throttle_and_steer() {
        let payload = DriveCommand::new(1.0, -1.0).to_payload();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["throttle"].as_f64(), Some(1.0));
        assert_eq!(object["steer"].as_f64(), Some(-1.0));
    }

    #[test]
    fn parses_controller_payload() {
        let command = DriveCommand::from_payload(br#"{"throttle": -1.0, "steer": 0.0}"#).unwrap();
        assert_eq!(command, DriveCommand::new(-1.0, 0.0));
    }

    #[test]
    fn accepts_integers_and_out_of_range_values() {
        let command = DriveCommand::from_payload(br#"{"throttle": 3, "steer": -2.5}"#).unwrap();
        assert_eq!(command, DriveCommand::new(3.0, -2.5));
    }

    #[test]
    fn ignores_unknown_fields() {
        let command =
            DriveCommand::from_payload(br#"{"throttle": 0.5, "steer": 0.0, "seq": 7}"#).unwrap();
        assert_eq!(command, DriveCommand::new(0.5, 0.0));
    }

    #[test]
    fn rejects_missing_field() {
        assert!(DriveCommand::from_payload(br#"{"throttle": 1.0}"#).is_err());
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert!(DriveCommand::from_payload(br#"{"throttle": "1.0", "steer": 0.0}"#).is_err());
        assert!(DriveCommand::from_payload(br#"{"throttle": null, "steer": 0.0}"#).is_err());
        assert!(DriveCommand::from_payload(br#"{"throttle": true, "steer": 0.0}"#).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(DriveCommand::from_payload(b"").is_err());
        assert!(DriveCommand::from_payload(b"throttle=1").is_err());
        assert!(DriveCommand::from_payload(&[0xff, 0xfe, 0x00]).is_err());
        assert!(DriveCommand::from_payload(b"[1.0, 0.0]").is_err());
    }

    #[test]
    fn rejects_values_that_overflow_f32() {
        let error = DriveCommand::from_payload(br#"{"throttle": 1e300, "steer": 0.0}"#);
        assert!(matches!(error, Err(CommandError::NonFinite("throttle"))));
    }
}
