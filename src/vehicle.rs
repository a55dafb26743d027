use anyhow::Context;
use std::{future::Future, time::Duration};
use tokio::{
    sync::mpsc::{self, error::TryRecvError},
    time::{interval, timeout, Instant, MissedTickBehavior},
};
use tracing::*;

use crate::{
    control::ControlState,
    driver::MotorDriver,
    error::DriverError,
    mixer::MotorOutput,
    transport::InboundPayload,
    watchdog::LinkState,
};

/// A write to the motors may take at most one tick.
async fn send_within(
    driver: &mut dyn MotorDriver,
    output: MotorOutput,
    limit: Duration,
) -> Result<(), DriverError> {
    match timeout(limit, driver.send(output)).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout),
    }
}

/// Car side loop.
///
/// Every tick drains all pending payloads, runs the watchdog and writes
/// the result to the motors, in that order.
pub struct VehicleLoop {
    state: ControlState,
    driver: Box<dyn MotorDriver>,
    period: Duration,
    inbound_closed: bool,
    driver_failing: bool,
}

impl VehicleLoop {
    /// Takes over the driver and puts the motors in neutral.
    ///
    /// Call this before connecting to the transport so the car can't move
    /// on whatever the motor board was doing before.
    pub async fn new(
        mut driver: Box<dyn MotorDriver>,
        staleness_timeout: Duration,
        period: Duration,
    ) -> anyhow::Result<Self> {
        send_within(driver.as_mut(), MotorOutput::neutral(), period)
            .await
            .context("Failed to stop motors on startup")?;
        Ok(Self {
            state: ControlState::new(staleness_timeout, Instant::now()),
            driver,
            period,
            inbound_closed: false,
            driver_failing: false,
        })
    }

    fn drain_inbound(&mut self, inbound: &mut mpsc::Receiver<InboundPayload>) {
        loop {
            match inbound.try_recv() {
                Ok(message) => {
                    let received = self.state.receive(&message.payload, message.received_at);
                    if let Err(err) = received {
                        warn!("Dropping command {}", err);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.inbound_closed {
                        error!("Command subscription closed, motors will stay stopped");
                        self.inbound_closed = true;
                    }
                    break;
                }
            }
        }
    }

    pub async fn tick(
        &mut self,
        inbound: &mut mpsc::Receiver<InboundPayload>,
    ) -> (LinkState, MotorOutput) {
        self.drain_inbound(inbound);
        let (link_state, output) = self.state.evaluate(Instant::now());

        match send_within(self.driver.as_mut(), output, self.period).await {
            Ok(()) => {
                if self.driver_failing {
                    info!("Motor driver recovered");
                    self.driver_failing = false;
                }
            }
            Err(err) => {
                if !self.driver_failing {
                    error!("Failed to send motor output {}", err);
                    self.driver_failing = true;
                }
            }
        }
        (link_state, output)
    }

    /// Runs until `shutdown` resolves, then leaves the motors in neutral.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<InboundPayload>,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(period = ?self.period, "Vehicle loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.tick(&mut inbound).await;
                }
            }
        }

        info!("Stopping motors");
        send_within(self.driver.as_mut(), MotorOutput::neutral(), self.period)
            .await
            .context("Failed to stop motors on shutdown")?;
        Ok(())
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{command::DriveCommand, error::DriverError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    const TIMEOUT: Duration = Duration::from_millis(500);
    const PERIOD: Duration = Duration::from_millis(10);

    #[derive(Clone, Default)]
    struct RecordingDriver {
        outputs: Arc<Mutex<Vec<MotorOutput>>>,
        fail: bool,
        /// Writes after this many accepted outputs never complete
        stall_after: Option<usize>,
    }

    impl RecordingDriver {
        fn outputs(&self) -> Vec<MotorOutput> {
            self.outputs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MotorDriver for RecordingDriver {
        async fn send(&mut self, output: MotorOutput) -> Result<(), DriverError> {
            if self.fail {
                return Err(DriverError::CommError);
            }
            let accepted = self.outputs.lock().unwrap().len();
            if Some(accepted) == self.stall_after {
                futures::future::pending::<()>().await;
            }
            self.outputs.lock().unwrap().push(output);
            Ok(())
        }
    }

    fn payload(throttle: f32, steer: f32) -> InboundPayload {
        InboundPayload::new(DriveCommand::new(throttle, steer).to_payload())
    }

    #[tokio::test(start_paused = true)]
    async fn motors_neutral_before_anything_else() {
        let driver = RecordingDriver::default();
        let _vehicle = VehicleLoop::new(Box::new(driver.clone()), TIMEOUT, PERIOD)
            .await
            .unwrap();
        assert_eq!(driver.outputs(), vec![MotorOutput::neutral()]);
    }

    #[tokio::test(start_paused = true)]
    async fn startup_fails_when_motors_cannot_be_stopped() {
        let driver = RecordingDriver {
            fail: true,
            ..Default::default()
        };
        assert!(VehicleLoop::new(Box::new(driver), TIMEOUT, PERIOD)
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn no_output_without_a_command() {
        let driver = RecordingDriver::default();
        let mut vehicle = VehicleLoop::new(Box::new(driver), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (_sender, mut inbound) = mpsc::channel(8);
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Stopped, MotorOutput::neutral())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn command_applied_then_stopped_on_silence() {
        let driver = RecordingDriver::default();
        let mut vehicle = VehicleLoop::new(Box::new(driver.clone()), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, mut inbound) = mpsc::channel(8);

        sender.send(payload(0.0, 1.0)).await.unwrap();
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Active, MotorOutput::new(1.0, -1.0))
        );

        tokio::time::advance(Duration::from_millis(499)).await;
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Active, MotorOutput::new(1.0, -1.0))
        );

        tokio::time::advance(Duration::from_millis(101)).await;
        for _ in 0..5 {
            assert_eq!(
                vehicle.tick(&mut inbound).await,
                (LinkState::Stopped, MotorOutput::neutral())
            );
            tokio::time::advance(PERIOD).await;
        }
        assert_eq!(driver.outputs().last(), Some(&MotorOutput::neutral()));
    }

    #[tokio::test(start_paused = true)]
    async fn latest_pending_command_wins() {
        let driver = RecordingDriver::default();
        let mut vehicle = VehicleLoop::new(Box::new(driver), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, mut inbound) = mpsc::channel(8);
        sender.send(payload(1.0, 0.0)).await.unwrap();
        sender.send(payload(-1.0, 0.0)).await.unwrap();
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Active, MotorOutput::new(-1.0, -1.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_keeps_output_and_timeout() {
        let driver = RecordingDriver::default();
        let mut vehicle = VehicleLoop::new(Box::new(driver), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, mut inbound) = mpsc::channel(8);
        sender.send(payload(1.0, 0.0)).await.unwrap();
        vehicle.tick(&mut inbound).await;
        let accepted_at = vehicle.state().last_command_time();

        tokio::time::advance(Duration::from_millis(300)).await;
        sender
            .send(InboundPayload::new(b"{\"steer\": 1.0}".to_vec()))
            .await
            .unwrap();
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Active, MotorOutput::new(1.0, 1.0))
        );
        assert_eq!(vehicle.state().last_command_time(), accepted_at);

        tokio::time::advance(Duration::from_millis(250)).await;
        sender
            .send(InboundPayload::new(b"garbage".to_vec()))
            .await
            .unwrap();
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Stopped, MotorOutput::neutral())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn closed_subscription_keeps_motors_stopped() {
        let driver = RecordingDriver::default();
        let mut vehicle = VehicleLoop::new(Box::new(driver), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, mut inbound) = mpsc::channel(8);
        sender.send(payload(1.0, 0.0)).await.unwrap();
        drop(sender);
        assert_eq!(vehicle.tick(&mut inbound).await.0, LinkState::Active);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Stopped, MotorOutput::neutral())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_leaves_motors_neutral() {
        let driver = RecordingDriver::default();
        let vehicle = VehicleLoop::new(Box::new(driver.clone()), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, inbound) = mpsc::channel(8);

        let feeder = tokio::spawn(async move {
            loop {
                if sender.send(payload(1.0, 0.0)).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
        });

        vehicle
            .run(inbound, tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();
        feeder.await.unwrap();

        let outputs = driver.outputs();
        assert!(outputs.contains(&MotorOutput::new(1.0, 1.0)));
        assert_eq!(outputs.last(), Some(&MotorOutput::neutral()));
    }

    #[tokio::test(start_paused = true)]
    async fn external_shutdown_signal_stops_motors() {
        let driver = RecordingDriver::default();
        let vehicle = VehicleLoop::new(Box::new(driver.clone()), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, inbound) = mpsc::channel(8);
        let (stop_sender, stop_receiver) = tokio::sync::oneshot::channel::<()>();

        let running = tokio::spawn(vehicle.run(inbound, async {
            let _ = stop_receiver.await;
        }));
        sender.send(payload(0.0, 1.0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            driver.outputs().last(),
            Some(&MotorOutput::new(1.0, -1.0))
        );

        // commands keep arriving, the signal alone has to stop the car
        sender.send(payload(0.0, 1.0)).await.unwrap();
        stop_sender.send(()).unwrap();
        running.await.unwrap().unwrap();
        assert_eq!(driver.outputs().last(), Some(&MotorOutput::neutral()));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_driver_does_not_block_the_tick() {
        let driver = RecordingDriver {
            stall_after: Some(1),
            ..Default::default()
        };
        let mut vehicle = VehicleLoop::new(Box::new(driver.clone()), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (sender, mut inbound) = mpsc::channel(8);
        sender.send(payload(1.0, 0.0)).await.unwrap();

        let started = Instant::now();
        assert_eq!(
            vehicle.tick(&mut inbound).await,
            (LinkState::Active, MotorOutput::new(1.0, 1.0))
        );
        assert!(started.elapsed() <= PERIOD);
        assert_eq!(driver.outputs(), vec![MotorOutput::neutral()]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_driver_fails_shutdown() {
        let driver = RecordingDriver {
            stall_after: Some(1),
            ..Default::default()
        };
        let vehicle = VehicleLoop::new(Box::new(driver), TIMEOUT, PERIOD)
            .await
            .unwrap();
        let (_sender, inbound) = mpsc::channel(8);
        let result = vehicle
            .run(inbound, tokio::time::sleep(Duration::from_millis(30)))
            .await;
        assert!(result.is_err());
    }
}
