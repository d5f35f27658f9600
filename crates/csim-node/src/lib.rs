//! Chain simulator node: configuration, logging and the in-memory simulator
//! behind the proxy's simulator endpoints.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod logging;
pub mod simulator;

pub use config::{CliOverrides, LogsConfig, NodeAppConfig, NodeConfigError, SimulatorConfig};
pub use logging::init_tracing;
pub use simulator::LocalSimulator;
