//! Outbound ports for the proxy.
//!
//! Everything the core reaches beyond its own memory goes through one of
//! these capabilities, injected at construction.

use crate::domain::{AddressState, InitialWalletKeys, SimulatorError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Raw answer of an observer: HTTP status plus the decoded JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverResponse {
    pub status: u16,
    pub body: Value,
}

impl ObserverResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport towards observer nodes
#[async_trait]
pub trait ObserverClient: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<ObserverResponse, TransportError>;

    async fn post(
        &self,
        url: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<ObserverResponse, TransportError>;
}

/// The chain simulator, treated as an opaque capability
#[async_trait]
pub trait SimulatorHandler: Send + Sync {
    /// Produce one block
    async fn generate_block(&self) -> Result<(), SimulatorError>;

    async fn generate_blocks_until_epoch_is_reached(
        &self,
        target_epoch: i32,
    ) -> Result<(), SimulatorError>;

    fn initial_wallet_keys(&self) -> InitialWalletKeys;

    async fn set_key_value_for_address(
        &self,
        address: &str,
        pairs: BTreeMap<String, String>,
    ) -> Result<(), SimulatorError>;

    async fn set_state_multiple(&self, states: &[AddressState]) -> Result<(), SimulatorError>;

    async fn remove_accounts(&self, addresses: &[String]) -> Result<(), SimulatorError>;

    /// Register raw BLS private keys
    async fn add_validator_keys(&self, keys: Vec<Vec<u8>>) -> Result<(), SimulatorError>;

    fn force_reset_validator_statistics_cache(&self) -> Result<(), SimulatorError>;

    /// REST interface (`host:port`) of every shard's observer
    fn rest_api_interfaces(&self) -> BTreeMap<u32, String>;
}

/// Conversion between the textual and the raw form of addresses
pub trait AddressConverter: Send + Sync {
    fn decode(&self, address: &str) -> Result<Vec<u8>, String>;

    fn encode(&self, raw: &[u8]) -> String;

    fn address_len(&self) -> usize;
}

/// Time source trait for testability
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Tokio time implementation, honours paused time in tests
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
