//! Network status, configuration and economics.

use crate::cache::{CachedResource, Fetcher};
use crate::domain::{ProxyError, ProxyResult};
use crate::process::base::{BaseProcessor, Dispatch, NODE_STATUS_PATH};
use async_trait::async_trait;
use csim_sharding::{shard_display, ShardId, METACHAIN_SHARD_ID};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const ECONOMICS_PATH: &str = "/network/economics";

pub struct EconomicsFetcher {
    base: Arc<BaseProcessor>,
}

#[async_trait]
impl Fetcher<Value> for EconomicsFetcher {
    async fn fetch(&self) -> ProxyResult<Value> {
        let reply = self
            .base
            .call_get_rest_end_point(METACHAIN_SHARD_ID, ECONOMICS_PATH)
            .await?;
        let metrics = reply.data_field("metrics")?.clone();
        Ok(json!({ "metrics": metrics }))
    }
}

pub struct NodeStatusProcessor {
    base: Arc<BaseProcessor>,
    economics: Arc<CachedResource<Value>>,
}

impl Dispatch for NodeStatusProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl NodeStatusProcessor {
    pub fn new(base: Arc<BaseProcessor>, economics_validity: Duration) -> Self {
        let fetcher = Arc::new(EconomicsFetcher {
            base: Arc::clone(&base),
        });
        Self {
            base,
            economics: Arc::new(CachedResource::new(
                "economics metrics",
                economics_validity,
                fetcher,
            )),
        }
    }

    pub async fn get_network_status(&self, shard: ShardId) -> ProxyResult<Value> {
        Ok(self.get(shard, "/network/status").await?.into_data())
    }

    pub async fn get_network_config(&self) -> ProxyResult<Value> {
        Ok(self
            .get(METACHAIN_SHARD_ID, "/network/config")
            .await?
            .into_data())
    }

    pub async fn get_economics(&self) -> ProxyResult<Value> {
        self.economics.get().await
    }

    pub async fn get_enable_epochs(&self) -> ProxyResult<Value> {
        Ok(self
            .get(METACHAIN_SHARD_ID, "/network/enable-epochs")
            .await?
            .into_data())
    }

    /// Issued ESDTs, optionally filtered by type (`fungible-tokens`, ...)
    pub async fn get_all_issued_esdts(&self, token_type: Option<&str>) -> ProxyResult<Value> {
        let path = match token_type {
            Some(kind) => format!("/network/esdt/{}", kind),
            None => "/network/esdts".to_string(),
        };
        Ok(self.get(METACHAIN_SHARD_ID, &path).await?.into_data())
    }

    /// Lowest final nonce across every shard
    pub async fn get_latest_fully_synchronized_hyperblock_nonce(&self) -> ProxyResult<u64> {
        let replies = self.get_all(NODE_STATUS_PATH).await?;

        let mut lowest: Option<u64> = None;
        for (shard, reply) in replies {
            let nonce = reply
                .data()
                .get("metrics")
                .and_then(|metrics| metrics.get("erd_highest_final_nonce"))
                .and_then(Value::as_u64)
                .ok_or_else(|| {
                    ProxyError::aggregation(
                        "latest synchronized nonce",
                        format!("shard {} reported no final nonce", shard_display(shard)),
                    )
                })?;
            lowest = Some(lowest.map_or(nonce, |current| current.min(nonce)));
        }

        lowest.ok_or_else(|| ProxyError::aggregation("latest synchronized nonce", "no shards"))
    }

    pub fn cache(&self) -> &Arc<CachedResource<Value>> {
        &self.economics
    }
}
