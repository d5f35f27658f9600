//! Response caching.
//!
//! `ResponseCache` is the keyed, time-boxed store. `CachedResource` binds a
//! singleton entry to its fetcher and owns the background refresh loop. The
//! heartbeat, validator statistics and economics caches are all
//! `CachedResource` instances, built by their processors.

pub mod cached_resource;
pub mod response_cache;

pub use cached_resource::{CachedResource, Fetcher};
pub use response_cache::{is_valid, ResponseCache, SINGLETON_KEY};
