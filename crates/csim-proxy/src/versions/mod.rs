//! Versioned facade registry.

pub mod registry;

pub use registry::{looks_like_version, VersionEntry, VersionsRegistry, ENDPOINT_GROUPS};
