//! Facades bridging HTTP handlers to processors and the simulator.

pub mod proxy;
pub mod simulator;

pub use proxy::{ProxyFacade, ProxyFacadeArgs};
pub use simulator::SimulatorFacade;
