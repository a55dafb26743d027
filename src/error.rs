use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErrorWrapper {
    #[error("zenoh error {0:?}")]
    ZenohError(zenoh::Error),
}

/// Inbound command rejected by the receiver.
///
/// Always a soft error. The message is dropped and nothing else changes.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("malformed command payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("field {0:?} is not a finite number")]
    NonFinite(&'static str),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("publish timed out")]
    Timeout,
    #[error(transparent)]
    Zenoh(#[from] ErrorWrapper),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DriverError {
    #[error("communication with motor driver failed")]
    CommError,
    #[error("motor driver did not accept output in time")]
    Timeout,
    #[error("failed opening serial port")]
    FailedOpeningSerialPort,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SensorError {
    #[error("communication with joystick bridge failed")]
    CommError,
    #[error("failed opening serial port")]
    FailedOpeningSerialPort,
    #[error("joystick bridge did not answer in time")]
    Timeout,
    #[error("joystick bridge closed the connection")]
    Disconnected,
    #[error("invalid joystick frame of {0} bytes")]
    InvalidFrame(usize),
}
