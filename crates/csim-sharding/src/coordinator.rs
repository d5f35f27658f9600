//! # Shard Coordinator
//!
//! Immutable value describing the shard layout of the simulated chain.

use crate::algorithms::{compute_masks, compute_shard, ShardMasks};
use crate::domain::{ShardError, ShardId, MAX_SHARD_COUNT, METACHAIN_SHARD_ID};

/// Maps addresses to shards for a fixed number of regular shards plus the
/// metachain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardCoordinator {
    num_shards: u32,
    self_id: ShardId,
    masks: ShardMasks,
}

impl ShardCoordinator {
    /// Create a coordinator for `num_shards` regular shards.
    ///
    /// `self_id` is the shard the owning process belongs to; the proxy uses
    /// the metachain.
    pub fn new(num_shards: u32, self_id: ShardId) -> Result<Self, ShardError> {
        if num_shards == 0 || num_shards > MAX_SHARD_COUNT {
            return Err(ShardError::InvalidShardCount(num_shards));
        }
        if self_id != METACHAIN_SHARD_ID && self_id >= num_shards {
            return Err(ShardError::UnknownShard(self_id));
        }

        Ok(Self {
            num_shards,
            self_id,
            masks: compute_masks(num_shards),
        })
    }

    /// Number of regular shards (metachain excluded).
    pub fn number_of_shards(&self) -> u32 {
        self.num_shards
    }

    /// Shard of the owning process.
    pub fn self_id(&self) -> ShardId {
        self.self_id
    }

    /// Shard that owns `address`.
    pub fn compute_id(&self, address: &[u8]) -> ShardId {
        compute_shard(address, self.num_shards, self.masks)
    }

    /// Whether `shard` is a regular shard or the metachain.
    pub fn is_known(&self, shard: ShardId) -> bool {
        shard == METACHAIN_SHARD_ID || shard < self.num_shards
    }

    /// Every shard id, regular shards first, metachain last.
    pub fn all_shard_ids(&self) -> Vec<ShardId> {
        (0..self.num_shards)
            .chain(std::iter::once(METACHAIN_SHARD_ID))
            .collect()
    }

    /// Whether two addresses live in the same shard.
    pub fn same_shard(&self, first: &[u8], second: &[u8]) -> bool {
        self.compute_id(first) == self.compute_id(second)
    }
}
