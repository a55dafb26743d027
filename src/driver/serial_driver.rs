use super::{MotorConfig, MotorDriver};
use crate::{error::DriverError, mixer::MotorOutput};
use anyhow::Error;
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use futures::SinkExt;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{Decoder, Encoder};
use tracing::*;

/// Motor board frame, one signed value per side already scaled to the
/// board's range.
#[derive(Default, Debug, PartialEq)]
pub struct WireMotorCommand {
    pub left: f32,
    pub right: f32,
}

impl WireMotorCommand {
    pub fn from_output(
        output: MotorOutput,
        multiplier: f32,
        left: &MotorConfig,
        right: &MotorConfig,
    ) -> Self {
        Self {
            left: left.apply(output.left()) * multiplier,
            right: right.apply(output.right()) * multiplier,
        }
    }

    fn encode(&self) -> Vec<u8> {
        // direction byte followed by magnitude, per motor
        let buffer = vec![
            (self.left > 0.0) as u8,
            self.left.abs() as u8,
            (self.right > 0.0) as u8,
            self.right.abs() as u8,
        ];

        let mut encoded = postcard_cobs::encode_vec(&buffer);
        encoded.push(0);
        encoded
    }
}

pub struct MotorBoardProtocol;

impl Decoder for MotorBoardProtocol {
    type Item = ();
    type Error = Error;

    fn decode(&mut self, _: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(None)
    }
}

impl Encoder<WireMotorCommand> for MotorBoardProtocol {
    type Error = Error;

    fn encode(&mut self, data: WireMotorCommand, buf: &mut BytesMut) -> Result<(), Error> {
        let encoded_data = data.encode();
        buf.reserve(encoded_data.len());
        buf.put_slice(&encoded_data);
        Ok(())
    }
}

pub struct SerialMotorDriver {
    framed_port: tokio_util::codec::Framed<tokio_serial::SerialStream, MotorBoardProtocol>,
    multiplier: f32,
    left: MotorConfig,
    right: MotorConfig,
}

const BAUD_RATE: u32 = 115200;

impl SerialMotorDriver {
    pub fn new(
        port: &str,
        multiplier: f32,
        left: MotorConfig,
        right: MotorConfig,
    ) -> Result<Self, DriverError> {
        let serial_port = tokio_serial::new(port, BAUD_RATE)
            .open_native_async()
            .map_err(|_| DriverError::FailedOpeningSerialPort)?;
        info!(port, "Opened motor board");
        Ok(Self {
            framed_port: MotorBoardProtocol.framed(serial_port),
            multiplier,
            left,
            right,
        })
    }
}

#[async_trait]
impl MotorDriver for SerialMotorDriver {
    async fn send(&mut self, output: MotorOutput) -> Result<(), DriverError> {
        let wire_command =
            WireMotorCommand::from_output(output, self.multiplier, &self.left, &self.right);
        self.framed_port
            .send(wire_command)
            .await
            .map_err(|_| DriverError::CommError)?;
        Ok(())
    }
}
