use anyhow::Result;
use clap::Parser;
use rc_drive::{
    configuration,
    driver::motor_driver_from_config,
    logging, signal,
    transport::{self, CommandTransport, DisconnectedTransport},
    vehicle::VehicleLoop,
};
use std::path::PathBuf;
use tracing::*;

#[derive(Parser, Debug)]
#[command(version, about = "RC car motor controller")]
struct Args {
    /// path to config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbosity: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_tracing(args.verbosity);

    let app_config = configuration::AppConfig::load_config(&args.config)?;
    let vehicle_config = app_config.vehicle.clone();

    // motors go to neutral before the network is touched
    let driver = motor_driver_from_config(vehicle_config.body.clone()).await?;
    let vehicle = VehicleLoop::new(
        driver,
        vehicle_config.staleness_timeout(),
        vehicle_config.evaluation_period(),
    )
    .await?;

    let transport = transport::connect(&app_config.zenoh, &app_config.topic).await;
    let inbound = match transport.subscribe().await {
        Ok(inbound) => inbound,
        Err(err) => {
            error!("Failed to subscribe to {:?} {}", app_config.topic, err);
            DisconnectedTransport.subscribe().await?
        }
    };
    info!(topic = %app_config.topic, "Waiting for commands");

    vehicle.run(inbound, signal::shutdown_signal()).await
}
