//! Account queries, routed to the shard owning the address.

use crate::domain::{AccountQueryOptions, ProxyError, ProxyResult};
use crate::observer::DataAvailability;
use crate::process::base::{BaseProcessor, Dispatch};
use csim_sharding::ShardId;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub struct AccountProcessor {
    base: Arc<BaseProcessor>,
}

impl Dispatch for AccountProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl AccountProcessor {
    pub fn new(base: Arc<BaseProcessor>) -> Self {
        Self { base }
    }

    #[instrument(skip(self, options))]
    pub async fn get_account(
        &self,
        address: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, "", options).await
    }

    pub async fn get_balance(
        &self,
        address: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, "/balance", options).await
    }

    /// Balance as an integer, smallest denomination
    pub async fn get_balance_value(&self, address: &str) -> ProxyResult<u128> {
        let data = self
            .get_balance(address, &AccountQueryOptions::default())
            .await?;
        let balance = data.get("balance").ok_or_else(|| {
            ProxyError::invalid_response(address.to_string(), "missing `balance`")
        })?;

        let text = balance.as_str().map(str::to_string).unwrap_or_else(|| balance.to_string());
        text.parse::<u128>()
            .map_err(|e| ProxyError::invalid_response(address.to_string(), e))
    }

    pub async fn get_nonce(
        &self,
        address: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, "/nonce", options).await
    }

    pub async fn get_username(
        &self,
        address: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, "/username", options).await
    }

    pub async fn get_value_for_key(
        &self,
        address: &str,
        key: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        if key.is_empty() || hex::decode(key).is_err() {
            return Err(ProxyError::BadRequest(format!("invalid storage key `{}`", key)));
        }
        self.query(address, &format!("/key/{}", key), options).await
    }

    pub async fn get_key_value_pairs(
        &self,
        address: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, "/keys", options).await
    }

    pub async fn get_esdt_tokens(
        &self,
        address: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, "/esdt", options).await
    }

    pub async fn get_esdt_token(
        &self,
        address: &str,
        token: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        self.query(address, &format!("/esdt/{}", token), options).await
    }

    /// Shard of the address, computed locally
    pub fn get_shard_id(&self, address: &str) -> ProxyResult<ShardId> {
        self.base.shard_id_for_address(address)
    }

    pub fn get_shard_data(&self, address: &str) -> ProxyResult<Value> {
        Ok(json!({ "shardID": self.get_shard_id(address)? }))
    }

    async fn query(
        &self,
        address: &str,
        suffix: &str,
        options: &AccountQueryOptions,
    ) -> ProxyResult<Value> {
        let shard = self.base.shard_id_for_address(address)?;
        let path = format!("/address/{}{}{}", address, suffix, options.to_query_string());
        let availability = if options.is_historical() {
            DataAvailability::AllHistory
        } else {
            DataAvailability::Recent
        };

        let reply = self
            .base
            .call_get_with_availability(shard, &path, availability)
            .await?;
        Ok(reply.into_data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeConfig;
    use crate::test_support::{address_in_shard, base_processor, base_processor_with_history, ok, MockObserverClient};

    #[tokio::test]
    async fn test_account_routed_to_owner_shard() {
        let client = MockObserverClient::new();
        client.on("http://s1-0/address/", ok(json!({"account": {"nonce": 3}})));
        let processor = AccountProcessor::new(base_processor(&client, 2, 1));

        let address = address_in_shard(1);
        let data = processor
            .get_account(&address, &AccountQueryOptions::default())
            .await
            .unwrap();
        assert_eq!(data["account"]["nonce"], 3);
        assert_eq!(client.calls(), vec![format!("GET http://s1-0/address/{}", address)]);
    }

    #[tokio::test]
    async fn test_historical_query_uses_full_history_node() {
        let client = MockObserverClient::new();
        client.on("http://history-0/", ok(json!({"balance": "10"})));
        let history = vec![NodeConfig {
            shard_id: 0,
            address: "http://history-0".into(),
            is_snapshotless: false,
        }];
        let processor = AccountProcessor::new(base_processor_with_history(&client, 2, 1, &history));

        let address = address_in_shard(0);
        let options = AccountQueryOptions {
            block_nonce: Some(42),
            ..Default::default()
        };
        processor.get_balance(&address, &options).await.unwrap();
        assert_eq!(
            client.calls(),
            vec![format!("GET http://history-0/address/{}/balance?blockNonce=42", address)]
        );
    }

    #[tokio::test]
    async fn test_balance_value() {
        let client = MockObserverClient::new();
        client.on("http://s0-0/address/", ok(json!({"balance": "1000000000000000000"})));
        let processor = AccountProcessor::new(base_processor(&client, 2, 1));

        let balance = processor.get_balance_value(&address_in_shard(0)).await.unwrap();
        assert_eq!(balance, 1_000_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let client = MockObserverClient::new();
        let processor = AccountProcessor::new(base_processor(&client, 2, 1));

        assert!(matches!(
            processor.get_account("xyz", &AccountQueryOptions::default()).await,
            Err(ProxyError::InvalidAddress(_))
        ));
        assert!(matches!(
            processor
                .get_value_for_key(&address_in_shard(0), "not-hex", &AccountQueryOptions::default())
                .await,
            Err(ProxyError::BadRequest(_))
        ));
        assert!(client.calls().is_empty());
        assert_eq!(
            processor.get_shard_data(&address_in_shard(1)).unwrap(),
            json!({"shardID": 1})
        );
    }
}
