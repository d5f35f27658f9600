//! Test doubles shared by the unit tests.

use crate::adapters::HexAddressConverter;
use crate::domain::{
    AddressState, InitialWalletKeys, NodeConfig, SimulatorError, TransportError, WalletKey,
};
use crate::observer::ObserverRegistry;
use crate::ports::{ObserverClient, ObserverResponse, SimulatorHandler};
use crate::process::BaseProcessor;
use async_trait::async_trait;
use csim_sharding::{ShardCoordinator, ShardId, METACHAIN_SHARD_ID};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Canned behaviour for URLs starting with a prefix
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(u16, Value),
    Refuse,
    Hang,
}

/// Successful envelope around `data`
pub fn ok(data: Value) -> MockReply {
    MockReply::Json(
        200,
        json!({"data": data, "error": "", "code": "successful"}),
    )
}

/// Observer transport that records every attempted URL in order.
///
/// The most recently registered matching prefix wins; unmatched URLs are
/// refused.
#[derive(Default)]
pub struct MockObserverClient {
    routes: Mutex<Vec<(String, MockReply)>>,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<(String, Value)>>,
}

impl MockObserverClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, prefix: &str, reply: MockReply) {
        self.routes.lock().push((prefix.to_string(), reply));
    }

    /// `"GET url"` / `"POST url"` in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn posted_bodies(&self) -> Vec<(String, Value)> {
        self.bodies.lock().clone()
    }

    fn reply(&self, url: &str) -> MockReply {
        self.routes
            .lock()
            .iter()
            .rev()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(MockReply::Refuse)
    }

    async fn answer(&self, url: &str) -> Result<ObserverResponse, TransportError> {
        match self.reply(url) {
            MockReply::Json(status, body) => Ok(ObserverResponse { status, body }),
            MockReply::Refuse => Err(TransportError::Connection {
                url: url.to_string(),
                reason: "connection refused".into(),
            }),
            MockReply::Hang => futures::future::pending().await,
        }
    }
}

#[async_trait]
impl ObserverClient for MockObserverClient {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<ObserverResponse, TransportError> {
        self.calls.lock().push(format!("GET {}", url));
        self.answer(url).await
    }

    async fn post(
        &self,
        url: &str,
        body: &Value,
        _timeout: Duration,
    ) -> Result<ObserverResponse, TransportError> {
        self.calls.lock().push(format!("POST {}", url));
        self.bodies.lock().push((url.to_string(), body.clone()));
        self.answer(url).await
    }
}

/// Observer address used by [`base_processor`]
pub fn observer_address(shard: ShardId, index: usize) -> String {
    if shard == METACHAIN_SHARD_ID {
        format!("http://meta-{}", index)
    } else {
        format!("http://s{}-{}", shard, index)
    }
}

pub fn node_configs(num_shards: u32, per_shard: usize) -> Vec<NodeConfig> {
    let coordinator = ShardCoordinator::new(num_shards, METACHAIN_SHARD_ID).unwrap();
    coordinator
        .all_shard_ids()
        .into_iter()
        .flat_map(|shard| {
            (0..per_shard).map(move |index| NodeConfig {
                shard_id: shard,
                address: observer_address(shard, index),
                is_snapshotless: false,
            })
        })
        .collect()
}

/// Base processor with `per_shard` observers for every shard
pub fn base_processor(
    client: &Arc<MockObserverClient>,
    num_shards: u32,
    per_shard: usize,
) -> Arc<BaseProcessor> {
    base_processor_with_history(client, num_shards, per_shard, &[])
}

pub fn base_processor_with_history(
    client: &Arc<MockObserverClient>,
    num_shards: u32,
    per_shard: usize,
    full_history: &[NodeConfig],
) -> Arc<BaseProcessor> {
    let coordinator = ShardCoordinator::new(num_shards, METACHAIN_SHARD_ID).unwrap();
    let registry = ObserverRegistry::new(
        &coordinator,
        &node_configs(num_shards, per_shard),
        full_history,
    )
    .unwrap();

    Arc::new(BaseProcessor::new(
        coordinator,
        Arc::new(registry),
        Arc::clone(client) as Arc<dyn ObserverClient>,
        Arc::new(HexAddressConverter),
        Duration::from_secs(10),
    ))
}

/// Hex address living in `shard` of a two-shard layout
pub fn address_in_shard(shard: u8) -> String {
    let mut raw = [0x11u8; 32];
    raw[31] = shard;
    hex::encode(raw)
}

/// Simulator handle counting calls
#[derive(Default)]
pub struct MockSimulator {
    pub blocks: AtomicUsize,
    pub fail_blocks: bool,
    pub states: Mutex<Vec<AddressState>>,
    pub removed: Mutex<Vec<String>>,
    pub missing_accounts: Vec<String>,
    pub keys: Mutex<Vec<Vec<u8>>>,
    pub epoch_targets: Mutex<Vec<i32>>,
    pub stats_resets: AtomicUsize,
    pub key_values: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    pub interfaces: BTreeMap<u32, String>,
}

impl MockSimulator {
    pub fn blocks(&self) -> usize {
        self.blocks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimulatorHandler for MockSimulator {
    async fn generate_block(&self) -> Result<(), SimulatorError> {
        if self.fail_blocks {
            return Err(SimulatorError::Failed("block production halted".into()));
        }
        self.blocks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate_blocks_until_epoch_is_reached(
        &self,
        target_epoch: i32,
    ) -> Result<(), SimulatorError> {
        self.epoch_targets.lock().push(target_epoch);
        Ok(())
    }

    fn initial_wallet_keys(&self) -> InitialWalletKeys {
        let mut keys = InitialWalletKeys::default();
        keys.balance_wallets.insert(
            0,
            WalletKey {
                address: address_in_shard(0),
                private_key_hex: "ab".repeat(32),
            },
        );
        keys
    }

    async fn set_key_value_for_address(
        &self,
        address: &str,
        pairs: BTreeMap<String, String>,
    ) -> Result<(), SimulatorError> {
        self.key_values.lock().push((address.to_string(), pairs));
        Ok(())
    }

    async fn set_state_multiple(&self, states: &[AddressState]) -> Result<(), SimulatorError> {
        self.states.lock().extend_from_slice(states);
        Ok(())
    }

    async fn remove_accounts(&self, addresses: &[String]) -> Result<(), SimulatorError> {
        for address in addresses {
            if self.missing_accounts.contains(address) {
                return Err(SimulatorError::AccountNotFound(address.clone()));
            }
            self.removed.lock().push(address.clone());
        }
        Ok(())
    }

    async fn add_validator_keys(&self, keys: Vec<Vec<u8>>) -> Result<(), SimulatorError> {
        self.keys.lock().extend(keys);
        Ok(())
    }

    fn force_reset_validator_statistics_cache(&self) -> Result<(), SimulatorError> {
        self.stats_resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rest_api_interfaces(&self) -> BTreeMap<u32, String> {
        self.interfaces.clone()
    }
}
