//! Ports (hexagonal architecture).

pub mod outbound;

pub use outbound::{
    AddressConverter, Clock, ObserverClient, ObserverResponse, SimulatorHandler, TokioClock,
};
