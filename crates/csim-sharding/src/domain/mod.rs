//! # Domain Module
//!
//! Core shard identifiers and errors.

pub mod errors;

pub use errors::*;
