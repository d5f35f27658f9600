//! # Domain Errors
//!
//! Shard identifiers and error types for shard coordination.

use thiserror::Error;

/// Shard identifier. Regular shards are `0..num_shards`, the metachain is
/// [`METACHAIN_SHARD_ID`].
pub type ShardId = u32;

/// Identifier reserved for the metachain.
pub const METACHAIN_SHARD_ID: ShardId = u32::MAX;

/// Upper bound on regular shards a simulator can be started with.
pub const MAX_SHARD_COUNT: u32 = 256;

/// Human readable shard name used in logs and error messages.
pub fn shard_display(shard: ShardId) -> String {
    if shard == METACHAIN_SHARD_ID {
        "metachain".to_string()
    } else {
        shard.to_string()
    }
}

/// Sharding error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShardError {
    /// Shard count outside `1..=MAX_SHARD_COUNT`.
    #[error("Invalid shard count: {0}")]
    InvalidShardCount(u32),

    /// Shard ID not managed by this coordinator.
    #[error("Unknown shard: {0}")]
    UnknownShard(ShardId),

    /// Address bytes could not be used for assignment.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_shard_error() {
        let err = ShardError::UnknownShard(99);
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_invalid_shard_count_error() {
        let err = ShardError::InvalidShardCount(0);
        assert!(err.to_string().contains('0'));
    }

    #[test]
    fn test_shard_display() {
        assert_eq!(shard_display(2), "2");
        assert_eq!(shard_display(METACHAIN_SHARD_ID), "metachain");
    }
}
