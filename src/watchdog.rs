use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Commands are fresh, mixer output is applied as is
    Active,
    /// Command link went silent, motors are held at neutral
    Stopped,
}

/// Staleness check on the time of the last accepted command.
///
/// There is no explicit stop message. The link is considered lost once
/// more than `timeout` passed since [`Watchdog::feed`] was last called.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    last_command_time: Instant,
}

impl Watchdog {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_command_time: now,
        }
    }

    pub fn feed(&mut self, now: Instant) {
        // never move backwards, arrivals can be handed over out of order
        self.last_command_time = self.last_command_time.max(now);
    }

    pub fn evaluate(&self, now: Instant) -> LinkState {
        if now.saturating_duration_since(self.last_command_time) > self.timeout {
            LinkState::Stopped
        } else {
            LinkState::Active
        }
    }

    pub fn last_command_time(&self) -> Instant {
        self.last_command_time
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
