//! # csim-sharding
//!
//! Shard coordination for the chain simulator proxy.
//!
//! ## Purpose
//!
//! Every account address of the simulated chain lives in exactly one shard.
//! The proxy needs that mapping to pick the observers that can answer a query:
//! - Mask-based assignment of an address to a shard in `[0, num_shards)`
//! - Reserved metachain shard for system smart contracts
//! - Enumeration of every shard the proxy must have observers for
//!
//! ## Module Structure
//!
//! ```text
//! csim-sharding/
//! ├── domain/          # ShardId, metachain id, ShardError
//! ├── algorithms/      # Mask computation and address assignment
//! └── coordinator.rs   # ShardCoordinator (the value handed to the proxy)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod coordinator;
pub mod domain;

// Re-exports
pub use algorithms::{compute_masks, compute_shard, is_system_contract_on_metachain, ShardMasks};
pub use coordinator::ShardCoordinator;
pub use domain::{shard_display, ShardError, ShardId, MAX_SHARD_COUNT, METACHAIN_SHARD_ID};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
