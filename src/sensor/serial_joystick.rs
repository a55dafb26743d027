use super::JoystickSensor;
use crate::{
    error::SensorError,
    sampler::{ButtonMask, JoystickSample},
};
use anyhow::{anyhow, Error};
use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use futures::{FutureExt, SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::*;

const BAUD_RATE: u32 = 115200;
const POLL_TIMEOUT: Duration = Duration::from_millis(20);
const POLL_REQUEST: u8 = 0x01;
const FRAME_LEN: usize = 8;

/// Serial link to the board that reads the joystick.
///
/// Every frame is COBS encoded and terminated by a zero byte. The host
/// sends a one byte poll request and the bridge answers with
/// `x: u16, y: u16, buttons: u32`, all little endian.
pub struct JoystickBridgeProtocol;

pub struct PollRequest;

impl Decoder for JoystickBridgeProtocol {
    type Item = JoystickSample;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(delimiter) = src.iter().position(|byte| *byte == 0) else {
            return Ok(None);
        };
        let frame = src.split_to(delimiter);
        src.advance(1);

        let mut data = BytesMut::from(
            postcard_cobs::decode_vec(&frame)
                .map_err(|_| anyhow!("failed to decode COBS frame"))?
                .as_slice(),
        );
        if data.len() != FRAME_LEN {
            return Err(SensorError::InvalidFrame(data.len()).into());
        }
        Ok(Some(JoystickSample::new(
            data.get_u16_le(),
            data.get_u16_le(),
            ButtonMask(data.get_u32_le()),
        )))
    }
}

impl Encoder<PollRequest> for JoystickBridgeProtocol {
    type Error = Error;

    fn encode(&mut self, _: PollRequest, buf: &mut BytesMut) -> Result<(), Error> {
        let mut encoded_data = postcard_cobs::encode_vec(&[POLL_REQUEST]);
        encoded_data.push(0);
        buf.reserve(encoded_data.len());
        buf.put_slice(&encoded_data);
        Ok(())
    }
}

/// Joystick bridge on any byte stream, a serial port in practice.
pub struct BridgeJoystick<T> {
    framed_port: Framed<T, JoystickBridgeProtocol>,
}

pub type SerialJoystick = BridgeJoystick<tokio_serial::SerialStream>;

impl SerialJoystick {
    pub fn open(port: &str) -> Result<Self, SensorError> {
        let serial_port = tokio_serial::new(port, BAUD_RATE)
            .open_native_async()
            .map_err(|_| SensorError::FailedOpeningSerialPort)?;
        info!(port, "Opened joystick bridge");
        Ok(Self::new(serial_port))
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> BridgeJoystick<T> {
    pub fn new(stream: T) -> Self {
        Self {
            framed_port: JoystickBridgeProtocol.framed(stream),
        }
    }

    /// Throws away replies to earlier polls that arrived after their timeout.
    fn discard_late_replies(&mut self) {
        while let Some(Some(late)) = self.framed_port.next().now_or_never() {
            trace!("Discarding late joystick reply {:?}", late);
        }
        self.framed_port.read_buffer_mut().clear();
    }
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> JoystickSensor for BridgeJoystick<T> {
    async fn read(&mut self) -> Result<JoystickSample, SensorError> {
        self.discard_late_replies();
        self.framed_port
            .send(PollRequest)
            .await
            .map_err(|_| SensorError::CommError)?;
        match tokio::time::timeout(POLL_TIMEOUT, self.framed_port.next()).await {
            Ok(Some(Ok(sample))) => Ok(sample),
            Ok(Some(Err(err))) => {
                debug!("Bad joystick frame {:?}", err);
                Err(SensorError::CommError)
            }
            Ok(None) => Err(SensorError::Disconnected),
            Err(_) => Err(SensorError::Timeout),
        }
    }
}
