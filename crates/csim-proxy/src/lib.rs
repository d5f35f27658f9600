#![allow(missing_docs)]

//! Chain simulator proxy - shard-aware HTTP front for a local chain simulator.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          CSIM PROXY                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Middleware Stack: Tracing → Cors → Metrics → RateLimit             │
//! │                            │                                        │
//! │   /{version}/... ──► Versions Registry ──► Proxy Facade             │
//! │   /simulator/... ──────────────────────► Simulator Facade           │
//! │                            │                                        │
//! │                   Domain Processors ◄── Response Caches             │
//! │                            │            (heartbeat, valstats,       │
//! │                  Base Request Processor  economics)                 │
//! │                            │                                        │
//! │                   Observer Registry                                 │
//! └────────────────────────────┼────────────────────────────────────────┘
//!                              │  HTTP, linear fallback per shard
//!            ┌─────────────────┼─────────────────┐
//!            ▼                 ▼                 ▼
//!        shard 0           shard 1           metachain
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use csim_proxy::{Proxy, ProxyArgs};
//!
//! let proxy = Proxy::create(args)?;
//! proxy.start().await?;
//! tokio::signal::ctrl_c().await?;
//! proxy.close().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod api;
pub mod cache;
pub mod domain;
pub mod facade;
pub mod lifecycle;
pub mod middleware;
pub mod observer;
pub mod ports;
pub mod process;
pub mod proxy;
pub mod versions;

#[cfg(test)]
mod test_support;

// Re-exports for public API
pub use adapters::{HexAddressConverter, HttpObserverClient};
pub use domain::config::ProxyConfig;
pub use domain::error::{ApiError, LifecycleError, ProxyError, ProxyResult};
pub use domain::types::*;
pub use ports::{AddressConverter, ObserverClient, SimulatorHandler};
pub use proxy::{Proxy, ProxyArgs};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
