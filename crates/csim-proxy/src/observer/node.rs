//! Observer node record.

use crate::domain::NodeConfig;
use csim_sharding::ShardId;
use std::sync::atomic::{AtomicBool, Ordering};

/// An observer or full-history node.
///
/// Only the health loop writes `synced`; request paths just read it.
#[derive(Debug)]
pub struct ObserverNode {
    address: String,
    shard_id: ShardId,
    is_snapshotless: bool,
    synced: AtomicBool,
}

impl ObserverNode {
    pub fn new(address: impl Into<String>, shard_id: ShardId, is_snapshotless: bool) -> Self {
        Self {
            address: address.into().trim_end_matches('/').to_string(),
            shard_id,
            is_snapshotless,
            synced: AtomicBool::new(true),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn is_snapshotless(&self) -> bool {
        self.is_snapshotless
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::Release);
    }

    /// Absolute URL for `path` on this node
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.address, path)
        } else {
            format!("{}/{}", self.address, path)
        }
    }
}

impl From<&NodeConfig> for ObserverNode {
    fn from(config: &NodeConfig) -> Self {
        Self::new(config.address.clone(), config.shard_id, config.is_snapshotless)
    }
}
