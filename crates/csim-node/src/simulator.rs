//! # In-memory chain simulator
//!
//! Keeps the round, nonce and epoch counters, the account states written
//! through the proxy and the registered validator keys. Blocks are produced
//! on demand or by an optional background loop.
//!
//! Wallet keys are deterministic placeholders: addresses are chosen so each
//! lands in its shard, private keys are not derived from them.

use async_trait::async_trait;
use csim_proxy::domain::{CloseError, NodeConfig, SimulatorError};
use csim_proxy::lifecycle::{BackgroundLoop, Closable};
use csim_proxy::{AddressState, InitialWalletKeys, SimulatorHandler, WalletKey};
use csim_sharding::{ShardCoordinator, ShardId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SimulatorConfig;

/// Upper bound of blocks produced while waiting for an epoch
pub const MAX_ROUNDS_TO_REACH_EPOCH: u64 = 10_000;

/// BLS private key length
pub const VALIDATOR_KEY_LEN: usize = 32;

const ADDRESS_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChainState {
    round: i64,
    nonce: u64,
}

pub struct LocalSimulator {
    config: SimulatorConfig,
    chain: Mutex<ChainState>,
    accounts: DashMap<String, AddressState>,
    validator_keys: Mutex<Vec<Vec<u8>>>,
    wallets: InitialWalletKeys,
    rest_interfaces: BTreeMap<u32, String>,
    stats_resets: AtomicU64,
    auto_generate: BackgroundLoop,
}

impl LocalSimulator {
    /// `observers` provide each shard's REST interface, first node per shard
    pub fn new(
        config: SimulatorConfig,
        coordinator: &ShardCoordinator,
        observers: &[NodeConfig],
    ) -> Self {
        let chain = ChainState {
            round: config.initial_round,
            nonce: config.initial_nonce,
        };
        let wallets = initial_wallets(coordinator);

        let accounts = DashMap::new();
        for wallet in wallets
            .balance_wallets
            .values()
            .chain(wallets.stake_wallets.iter())
        {
            accounts.insert(
                wallet.address.clone(),
                AddressState {
                    address: wallet.address.clone(),
                    nonce: Some(0),
                    balance: Some("0".to_string()),
                    ..Default::default()
                },
            );
        }

        Self {
            chain: Mutex::new(chain),
            accounts,
            validator_keys: Mutex::new(Vec::new()),
            wallets,
            rest_interfaces: rest_interfaces(observers),
            stats_resets: AtomicU64::new(0),
            auto_generate: BackgroundLoop::new("auto block generation"),
            config,
        }
    }

    pub fn current_round(&self) -> i64 {
        self.chain.lock().round
    }

    pub fn current_nonce(&self) -> u64 {
        self.chain.lock().nonce
    }

    pub fn current_epoch(&self) -> u32 {
        self.epoch_at(self.current_round())
    }

    fn epoch_at(&self, round: i64) -> u32 {
        let elapsed = round.saturating_sub(self.config.initial_round).max(0) as u64;
        let epochs = elapsed / self.config.rounds_per_epoch.max(1);
        self.config
            .initial_epoch
            .saturating_add(u32::try_from(epochs).unwrap_or(u32::MAX))
    }

    pub fn account(&self, address: &str) -> Option<AddressState> {
        self.accounts.get(address).map(|entry| entry.value().clone())
    }

    pub fn validator_key_count(&self) -> usize {
        self.validator_keys.lock().len()
    }

    pub fn validator_statistics_resets(&self) -> u64 {
        self.stats_resets.load(Ordering::Relaxed)
    }

    fn produce_block(&self) -> ChainState {
        let mut chain = self.chain.lock();
        chain.round += 1;
        chain.nonce += 1;
        *chain
    }

    /// Produce a block every configured block time until closed
    pub fn start_auto_generate(self: &Arc<Self>) -> bool {
        let weak = Arc::downgrade(self);
        let started = self.auto_generate.start(self.config.block_time(), move || {
            let weak = weak.clone();
            async move {
                if let Some(simulator) = weak.upgrade() {
                    if let Err(e) = simulator.generate_block().await {
                        warn!(error = %e, "Automatic block generation failed");
                    }
                }
            }
        });
        if started {
            info!(
                block_time_ms = self.config.block_time_in_milliseconds,
                "Automatic block generation started"
            );
        }
        started
    }

    pub fn is_auto_generating(&self) -> bool {
        self.auto_generate.is_running()
    }
}

#[async_trait]
impl SimulatorHandler for LocalSimulator {
    async fn generate_block(&self) -> Result<(), SimulatorError> {
        let chain = self.produce_block();
        debug!(
            round = chain.round,
            nonce = chain.nonce,
            epoch = self.epoch_at(chain.round),
            "Block generated"
        );
        Ok(())
    }

    async fn generate_blocks_until_epoch_is_reached(
        &self,
        target_epoch: i32,
    ) -> Result<(), SimulatorError> {
        let target = u32::try_from(target_epoch)
            .map_err(|_| SimulatorError::Failed(format!("invalid target epoch {}", target_epoch)))?;

        for _ in 0..MAX_ROUNDS_TO_REACH_EPOCH {
            let chain = self.produce_block();
            if self.epoch_at(chain.round) >= target {
                info!(epoch = target, round = chain.round, "Target epoch reached");
                return Ok(());
            }
        }
        Err(SimulatorError::Failed(format!(
            "exceeded {} rounds without reaching epoch {}",
            MAX_ROUNDS_TO_REACH_EPOCH, target
        )))
    }

    fn initial_wallet_keys(&self) -> InitialWalletKeys {
        self.wallets.clone()
    }

    async fn set_key_value_for_address(
        &self,
        address: &str,
        pairs: BTreeMap<String, String>,
    ) -> Result<(), SimulatorError> {
        check_address(address)?;
        for (key, value) in &pairs {
            if hex::decode(key).is_err() || hex::decode(value).is_err() {
                return Err(SimulatorError::Failed(format!(
                    "key-value pair `{}`=`{}` is not hex",
                    key, value
                )));
            }
        }

        self.accounts
            .entry(address.to_string())
            .or_insert_with(|| empty_account(address))
            .keys
            .extend(pairs);
        Ok(())
    }

    async fn set_state_multiple(&self, states: &[AddressState]) -> Result<(), SimulatorError> {
        // all or nothing
        for state in states {
            check_address(&state.address)?;
            if let Some(balance) = &state.balance {
                if balance.parse::<u128>().is_err() {
                    return Err(SimulatorError::Failed(format!(
                        "invalid balance `{}` for {}",
                        balance, state.address
                    )));
                }
            }
        }

        for state in states {
            let mut account = self
                .accounts
                .entry(state.address.clone())
                .or_insert_with(|| empty_account(&state.address));
            if let Some(nonce) = state.nonce {
                account.nonce = Some(nonce);
            }
            if let Some(balance) = &state.balance {
                account.balance = Some(balance.clone());
            }
            account.keys.extend(state.keys.clone());
            account.extra.extend(state.extra.clone());
        }
        debug!(accounts = states.len(), "Account states set");
        Ok(())
    }

    async fn remove_accounts(&self, addresses: &[String]) -> Result<(), SimulatorError> {
        for address in addresses {
            if self.accounts.remove(address).is_none() {
                return Err(SimulatorError::AccountNotFound(address.clone()));
            }
        }
        Ok(())
    }

    async fn add_validator_keys(&self, keys: Vec<Vec<u8>>) -> Result<(), SimulatorError> {
        if let Some((index, key)) = keys
            .iter()
            .enumerate()
            .find(|(_, key)| key.len() != VALIDATOR_KEY_LEN)
        {
            return Err(SimulatorError::Failed(format!(
                "validator key {} has {} bytes, expected {}",
                index,
                key.len(),
                VALIDATOR_KEY_LEN
            )));
        }

        let mut registered = self.validator_keys.lock();
        registered.extend(keys);
        info!(total = registered.len(), "Validator keys added");
        Ok(())
    }

    fn force_reset_validator_statistics_cache(&self) -> Result<(), SimulatorError> {
        self.stats_resets.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rest_api_interfaces(&self) -> BTreeMap<u32, String> {
        self.rest_interfaces.clone()
    }
}

impl Closable for LocalSimulator {
    fn name(&self) -> &str {
        "local simulator"
    }

    fn close(&self) -> Result<(), CloseError> {
        self.auto_generate.stop();
        Ok(())
    }
}

fn check_address(address: &str) -> Result<(), SimulatorError> {
    match hex::decode(address) {
        Ok(raw) if raw.len() == ADDRESS_LEN => Ok(()),
        _ => Err(SimulatorError::Failed(format!("invalid address `{}`", address))),
    }
}

fn empty_account(address: &str) -> AddressState {
    AddressState {
        address: address.to_string(),
        nonce: Some(0),
        balance: Some("0".to_string()),
        ..Default::default()
    }
}

/// A 32-byte address owned by `shard`, derived from `seed`
fn address_in_shard(coordinator: &ShardCoordinator, shard: ShardId, seed: u8) -> Option<Vec<u8>> {
    let mut raw = vec![seed; ADDRESS_LEN];
    (0..=u8::MAX).find_map(|last| {
        raw[ADDRESS_LEN - 1] = last;
        (coordinator.compute_id(&raw) == shard).then(|| raw.clone())
    })
}

fn initial_wallets(coordinator: &ShardCoordinator) -> InitialWalletKeys {
    let mut wallets = InitialWalletKeys::default();

    for shard in 0..coordinator.number_of_shards() {
        let index = (shard % 100) as u8;
        for (seed, stake) in [(0x10 + index, false), (0x90 + index, true)] {
            let Some(raw) = address_in_shard(coordinator, shard, seed) else {
                warn!(shard, "No wallet address found for shard");
                continue;
            };
            let key = WalletKey {
                address: hex::encode(&raw),
                private_key_hex: hex::encode(raw.iter().rev().map(|b| b ^ 0xa5).collect::<Vec<_>>()),
            };
            if stake {
                wallets.stake_wallets.push(key);
            } else {
                wallets.balance_wallets.insert(shard, key);
            }
        }
    }
    wallets
}

/// `host:port` per shard, from the first observer of each shard
fn rest_interfaces(observers: &[NodeConfig]) -> BTreeMap<u32, String> {
    let mut interfaces = BTreeMap::new();
    for node in observers {
        let host = node
            .address
            .split_once("://")
            .map_or(node.address.as_str(), |(_, rest)| rest);
        let host = host.split('/').next().unwrap_or(host);
        interfaces
            .entry(node.shard_id)
            .or_insert_with(|| host.to_string());
    }
    interfaces
}
