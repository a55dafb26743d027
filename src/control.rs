use std::time::Duration;
use tokio::time::Instant;
use tracing::*;

use crate::{
    command::DriveCommand,
    error::CommandError,
    mixer::{mix, MotorOutput},
    watchdog::{LinkState, Watchdog},
};

/// Vehicle side control context.
///
/// Owns the watchdog and the last accepted command. Inbound payloads go
/// through [`ControlState::receive`], the drive loop reads the output to
/// apply from [`ControlState::evaluate`].
#[derive(Debug)]
pub struct ControlState {
    watchdog: Watchdog,
    last_command: Option<DriveCommand>,
    link_state: LinkState,
}

impl ControlState {
    pub fn new(staleness_timeout: Duration, now: Instant) -> Self {
        Self {
            watchdog: Watchdog::new(staleness_timeout, now),
            last_command: None,
            link_state: LinkState::Stopped,
        }
    }

    /// Decode and accept one inbound payload.
    ///
    /// A rejected payload leaves the state untouched, including the
    /// watchdog timestamp.
    pub fn receive(&mut self, payload: &[u8], now: Instant) -> Result<DriveCommand, CommandError> {
        let command = DriveCommand::from_payload(payload)?;
        trace!(?command, "Accepted drive command");
        self.last_command = Some(command);
        self.watchdog.feed(now);
        Ok(command)
    }

    /// Output to apply on this tick.
    ///
    /// Neutral whenever the link is stale or no command was accepted yet.
    pub fn evaluate(&mut self, now: Instant) -> (LinkState, MotorOutput) {
        let (state, output) = match (self.watchdog.evaluate(now), self.last_command) {
            (LinkState::Active, Some(command)) => {
                (LinkState::Active, mix(command.throttle, command.steer))
            }
            _ => (LinkState::Stopped, MotorOutput::neutral()),
        };

        if state != self.link_state {
            match state {
                LinkState::Active => info!("Command link active"),
                LinkState::Stopped => warn!(
                    timeout = ?self.watchdog.timeout(),
                    "No command within timeout, stopping motors"
                ),
            }
            self.link_state = state;
        }
        (state, output)
    }

    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    pub fn last_command(&self) -> Option<DriveCommand> {
        self.last_command
    }

    pub fn last_command_time(&self) -> Instant {
        self.watchdog.last_command_time()
    }
}
