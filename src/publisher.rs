use std::{sync::Arc, time::Duration};
use tokio::time::timeout;

use crate::{command::DriveCommand, error::TransportError, transport::CommandTransport};

/// Sends drive commands, never waiting longer than `send_timeout`.
pub struct CommandPublisher {
    transport: Arc<dyn CommandTransport>,
    send_timeout: Duration,
}

impl CommandPublisher {
    pub fn new(transport: Arc<dyn CommandTransport>, send_timeout: Duration) -> Self {
        Self {
            transport,
            send_timeout,
        }
    }

    pub async fn publish(&self, command: &DriveCommand) -> Result<(), TransportError> {
        match timeout(self.send_timeout, self.transport.publish(command.to_payload())).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}
