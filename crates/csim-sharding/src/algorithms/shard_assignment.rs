//! # Shard Assignment Algorithm
//!
//! Deterministic, mask-based assignment of account addresses to shards.
//!
//! The trailing bytes of an address are read as a big-endian integer and
//! masked with the smallest all-ones mask that covers every shard id. Values
//! that land beyond the last shard are folded back with the next smaller mask,
//! so every address resolves to exactly one shard.

use crate::domain::{ShardId, METACHAIN_SHARD_ID};

/// Leading zero bytes that mark a smart-contract address.
const SC_ADDRESS_ZERO_PREFIX: usize = 8;
/// Offset of the zeroed region that marks a metachain system contract.
const SC_METACHAIN_REGION_START: usize = 10;
/// Length of the zeroed region that marks a metachain system contract.
const SC_METACHAIN_REGION_LEN: usize = 5;
/// Trailing byte of every metachain system contract.
const METACHAIN_IDENTIFIER: u8 = 0xFF;

/// Masks derived from the shard count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardMasks {
    /// `2^n - 1` where `n = ceil(log2(num_shards))`
    pub high: u32,
    /// `2^(n-1) - 1`
    pub low: u32,
}

/// Compute the assignment masks for `num_shards` shards.
pub fn compute_masks(num_shards: u32) -> ShardMasks {
    if num_shards <= 1 {
        return ShardMasks { high: 0, low: 0 };
    }

    // ceil(log2(num_shards)) is the bit length of num_shards - 1
    let n = u32::BITS - (num_shards - 1).leading_zeros();
    ShardMasks {
        high: (1u32 << n) - 1,
        low: (1u32 << (n - 1)) - 1,
    }
}

/// Whether `address` is a system smart contract hosted by the metachain.
pub fn is_system_contract_on_metachain(address: &[u8]) -> bool {
    if address.len() <= SC_METACHAIN_REGION_START + SC_METACHAIN_REGION_LEN {
        return false;
    }

    let is_contract = address[..SC_ADDRESS_ZERO_PREFIX].iter().all(|b| *b == 0);
    let region = &address
        [SC_METACHAIN_REGION_START..SC_METACHAIN_REGION_START + SC_METACHAIN_REGION_LEN];

    is_contract
        && region.iter().all(|b| *b == 0)
        && address[address.len() - 1] == METACHAIN_IDENTIFIER
}

/// Assign `address` to a shard.
///
/// `num_shards` must be at least 1; the coordinator enforces it.
pub fn compute_shard(address: &[u8], num_shards: u32, masks: ShardMasks) -> ShardId {
    if is_system_contract_on_metachain(address) {
        return METACHAIN_SHARD_ID;
    }

    let bytes_needed = (num_shards / 256) as usize + 1;
    let start = address.len().saturating_sub(bytes_needed);

    let value = address[start..]
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));

    let shard = value & masks.high;
    if shard > num_shards.saturating_sub(1) {
        value & masks.low
    } else {
        shard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_address(last: u8) -> [u8; 32] {
        let mut addr = [0x11u8; 32];
        addr[31] = last;
        addr
    }

    #[test]
    fn test_masks_for_common_shard_counts() {
        assert_eq!(compute_masks(1), ShardMasks { high: 0, low: 0 });
        assert_eq!(compute_masks(2), ShardMasks { high: 1, low: 0 });
        assert_eq!(compute_masks(3), ShardMasks { high: 3, low: 1 });
        assert_eq!(compute_masks(4), ShardMasks { high: 3, low: 1 });
        assert_eq!(compute_masks(5), ShardMasks { high: 7, low: 3 });
    }

    #[test]
    fn test_single_shard_takes_everything() {
        let masks = compute_masks(1);
        for last in [0u8, 1, 7, 200, 254] {
            assert_eq!(compute_shard(&make_address(last), 1, masks), 0);
        }
    }

    #[test]
    fn test_three_shards_fold_back() {
        let masks = compute_masks(3);
        assert_eq!(compute_shard(&make_address(0x00), 3, masks), 0);
        assert_eq!(compute_shard(&make_address(0x01), 3, masks), 1);
        assert_eq!(compute_shard(&make_address(0x02), 3, masks), 2);
        // 3 & 0b11 = 3 is out of range, folded with 0b01
        assert_eq!(compute_shard(&make_address(0x03), 3, masks), 1);
    }

    #[test]
    fn test_assignment_deterministic() {
        let masks = compute_masks(3);
        let addr = make_address(0x42);
        assert_eq!(
            compute_shard(&addr, 3, masks),
            compute_shard(&addr, 3, masks)
        );
    }

    #[test]
    fn test_esdt_system_contract_is_metachain() {
        let addr =
            hex::decode("000000000000000000010000000000000000000000000000000000000002ffff")
                .unwrap();
        assert!(is_system_contract_on_metachain(&addr));
        assert_eq!(
            compute_shard(&addr, 3, compute_masks(3)),
            METACHAIN_SHARD_ID
        );
    }

    #[test]
    fn test_user_contract_is_not_metachain() {
        let mut addr = [0u8; 32];
        addr[12] = 0x05;
        addr[31] = 0xFF;
        assert!(!is_system_contract_on_metachain(&addr));
    }

    #[test]
    fn test_short_address_never_metachain() {
        assert!(!is_system_contract_on_metachain(&[0u8; 4]));
    }
}
