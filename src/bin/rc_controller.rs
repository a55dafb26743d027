use anyhow::Result;
use clap::Parser;
use rc_drive::{
    configuration,
    controller::{open_link, ControllerLoop},
    logging,
    publisher::CommandPublisher,
    sampler::InputSampler,
    sensor::joystick_from_config,
    signal,
    status::TracingDisplay,
};
use std::path::PathBuf;
use tracing::*;

#[derive(Parser, Debug)]
#[command(version, about = "RC car joystick controller")]
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
    let controller_config = app_config.controller.clone();

    let sensor = joystick_from_config(&controller_config.sensor)?;
    let mut display = Box::<TracingDisplay>::default();
    let transport = open_link(display.as_mut(), &app_config.zenoh, &app_config.topic).await;
    let publisher = CommandPublisher::new(transport, controller_config.sample_period());

    let controller = ControllerLoop::new(
        sensor,
        InputSampler::new(controller_config.dead_zone),
        publisher,
        display,
        controller_config.sample_period(),
    );
    info!(topic = %app_config.topic, "Publishing commands");

    controller.run(signal::shutdown_signal()).await;
    Ok(())
}
