use async_trait::async_trait;
use std::sync::Arc;
use tokio::{
    sync::{broadcast, mpsc},
    time::Instant,
};
use tracing::*;
use zenoh::{
    prelude::r#async::*, publication::CongestionControl, Session, SessionDeclarations,
};

use crate::{
    configuration::RcZenohConfig,
    error::{ErrorWrapper, TransportError},
};

/// Inbound payloads waiting for the vehicle loop.
const INBOUND_QUEUE_SIZE: usize = 32;

/// Payload stamped with the time it came off the wire.
#[derive(Debug, Clone)]
pub struct InboundPayload {
    pub payload: Vec<u8>,
    pub received_at: Instant,
}

impl InboundPayload {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            received_at: Instant::now(),
        }
    }
}

/// Best effort publish/subscribe channel carrying command payloads.
///
/// No delivery, ordering or duplication guarantees.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Payloads that arrive after this call. When the channel is full new
    /// payloads are dropped.
    async fn subscribe(&self) -> Result<mpsc::Receiver<InboundPayload>, TransportError>;

    /// False once the session could not be opened.
    fn is_connected(&self) -> bool {
        true
    }
}

pub struct ZenohTransport {
    session: Arc<Session>,
    topic: String,
}

impl ZenohTransport {
    pub async fn open(config: &RcZenohConfig, topic: &str) -> anyhow::Result<Self> {
        let zenoh_config = config.session_config()?;
        let session = zenoh::open(zenoh_config)
            .res()
            .await
            .map_err(ErrorWrapper::ZenohError)?
            .into_arc();
        Ok(Self {
            session,
            topic: topic.to_owned(),
        })
    }
}

#[async_trait]
impl CommandTransport for ZenohTransport {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.session
            .put(self.topic.as_str(), payload)
            .congestion_control(CongestionControl::Drop)
            .res()
            .await
            .map_err(ErrorWrapper::ZenohError)?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<InboundPayload>, TransportError> {
        let subscriber = self
            .session
            .declare_subscriber(self.topic.as_str())
            .res()
            .await
            .map_err(ErrorWrapper::ZenohError)?;
        let (sender, receiver) = mpsc::channel(INBOUND_QUEUE_SIZE);
        let topic = self.topic.clone();

        tokio::spawn(async move {
            while let Ok(sample) = subscriber.recv_async().await {
                let payload = InboundPayload::new(sample.value.payload.contiguous().to_vec());
                match sender.try_send(payload) {
                    Ok(()) => (),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        trace!("Inbound queue full, dropping command")
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
            warn!(%topic, "Zenoh subscriber stopped");
        });
        Ok(receiver)
    }
}

/// In process transport for tests and single host setups.
#[derive(Clone)]
pub struct LoopbackTransport {
    sender: broadcast::Sender<Vec<u8>>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(INBOUND_QUEUE_SIZE);
        Self { sender }
    }
}

#[async_trait]
impl CommandTransport for LoopbackTransport {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        // nobody listening is not an error on a fire and forget channel
        let _ = self.sender.send(payload);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<InboundPayload>, TransportError> {
        let mut broadcast_receiver = self.sender.subscribe();
        let (sender, receiver) = mpsc::channel(INBOUND_QUEUE_SIZE);
        tokio::spawn(async move {
            loop {
                match broadcast_receiver.recv().await {
                    Ok(payload) => {
                        let payload = InboundPayload::new(payload);
                        if let Err(mpsc::error::TrySendError::Closed(_)) = sender.try_send(payload)
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        trace!(skipped, "Loopback subscriber lagged")
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(receiver)
    }
}

/// Used after the broker could not be reached.
///
/// Publishing always fails and subscriptions never deliver, so the car
/// side watchdog keeps the motors stopped.
#[derive(Debug, Default)]
pub struct DisconnectedTransport;

#[async_trait]
impl CommandTransport for DisconnectedTransport {
    async fn publish(&self, _payload: Vec<u8>) -> Result<(), TransportError> {
        Err(TransportError::NotConnected)
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<InboundPayload>, TransportError> {
        let (_, receiver) = mpsc::channel(1);
        Ok(receiver)
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Single connection attempt. On failure the returned transport is
/// disconnected and the caller keeps running degraded.
pub async fn connect(config: &RcZenohConfig, topic: &str) -> Arc<dyn CommandTransport> {
    match ZenohTransport::open(config, topic).await {
        Ok(transport) => {
            info!(topic, "Zenoh session open");
            Arc::new(transport)
        }
        Err(err) => {
            error!("Failed to open zenoh session {:?}", err);
            Arc::new(DisconnectedTransport)
        }
    }
}
