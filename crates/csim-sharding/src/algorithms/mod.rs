//! # Algorithms Module
//!
//! Pure functions behind shard assignment.

pub mod shard_assignment;

pub use shard_assignment::*;
