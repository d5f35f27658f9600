//! Observer nodes and their per-shard registry.

pub mod node;
pub mod registry;

pub use node::ObserverNode;
pub use registry::{DataAvailability, ObserverRegistry};
