#![doc = include_str!("../README.md")]
pub mod command;
pub mod configuration;
pub mod control;
pub mod controller;
pub mod driver;
pub mod error;
pub mod logging;
pub mod mixer;
pub mod publisher;
pub mod sampler;
pub mod sensor;
pub mod signal;
pub mod status;
pub mod transport;
pub mod vehicle;
pub mod watchdog;
