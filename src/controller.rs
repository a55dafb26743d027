use std::{future::Future, sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::*;

use crate::{
    command::DriveCommand,
    configuration::RcZenohConfig,
    publisher::CommandPublisher,
    sampler::InputSampler,
    sensor::JoystickSensor,
    status::{ControllerStatus, LinkStatus, StatusDisplay},
    transport::{self, CommandTransport},
};

/// Connects once and reports the outcome on the display.
///
/// A failed connect still returns a transport, the controller keeps
/// sampling with every publish failing.
pub async fn open_link(
    display: &mut dyn StatusDisplay,
    config: &RcZenohConfig,
    topic: &str,
) -> Arc<dyn CommandTransport> {
    display.show_link(LinkStatus::Connecting);
    let transport = transport::connect(config, topic).await;
    if transport.is_connected() {
        display.show_link(LinkStatus::Connected);
    } else {
        display.show_link(LinkStatus::Error);
    }
    transport
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishStats {
    pub sent: u64,
    pub failed: u64,
    /// Ticks without a sensor reading, nothing was published
    pub skipped: u64,
}

/// Handheld side loop: sample the stick, publish, update the display.
///
/// The command is published every tick whether it changed or not, the
/// car's watchdog relies on that.
pub struct ControllerLoop {
    sensor: Box<dyn JoystickSensor>,
    sampler: InputSampler,
    publisher: CommandPublisher,
    display: Box<dyn StatusDisplay>,
    period: Duration,
    stats: PublishStats,
    link_failing: bool,
}

impl ControllerLoop {
    pub fn new(
        sensor: Box<dyn JoystickSensor>,
        sampler: InputSampler,
        publisher: CommandPublisher,
        display: Box<dyn StatusDisplay>,
        period: Duration,
    ) -> Self {
        Self {
            sensor,
            sampler,
            publisher,
            display,
            period,
            stats: PublishStats::default(),
            link_failing: false,
        }
    }

    /// One sampling cycle. Returns the command if one was published.
    pub async fn tick(&mut self) -> Option<DriveCommand> {
        let sample = match self.sensor.read().await {
            Ok(sample) => sample,
            Err(err) => {
                warn!("Failed to read joystick {}", err);
                self.stats.skipped += 1;
                return None;
            }
        };

        let command = self.sampler.map(&sample);
        let link = match self.publisher.publish(&command).await {
            Ok(()) => {
                if self.link_failing {
                    info!("Publishing recovered");
                    self.link_failing = false;
                }
                self.stats.sent += 1;
                LinkStatus::Sent
            }
            Err(err) => {
                if self.link_failing {
                    debug!("Publish failed {}", err);
                } else {
                    error!("Publish failed {}", err);
                    self.link_failing = true;
                }
                self.stats.failed += 1;
                LinkStatus::Error
            }
        };

        self.display.show(&ControllerStatus::new(
            &sample,
            &command,
            &self.sampler.dead_zone(),
            link,
        ));
        Some(command)
    }

    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> PublishStats {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(period = ?self.period, "Controller loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        info!(stats = ?self.stats, "Controller loop stopped");
        self.stats
    }

    pub fn stats(&self) -> PublishStats {
        self.stats
    }
}
