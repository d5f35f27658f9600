//! Node group processor: heartbeat status of every node, cached.

use crate::cache::{CachedResource, Fetcher};
use crate::domain::{ProxyError, ProxyResult};
use crate::process::base::{BaseProcessor, Dispatch};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const HEARTBEAT_PATH: &str = "/node/heartbeatstatus";

/// Heartbeats of all shards merged, one entry per public key
pub struct HeartbeatFetcher {
    base: Arc<BaseProcessor>,
}

#[async_trait]
impl Fetcher<Value> for HeartbeatFetcher {
    async fn fetch(&self) -> ProxyResult<Value> {
        let replies = self
            .base
            .call_get_rest_end_point_for_all(HEARTBEAT_PATH)
            .await?;

        let mut by_key: BTreeMap<String, Value> = BTreeMap::new();
        for (_, reply) in replies {
            let heartbeats = reply
                .data_field("heartbeats")?
                .as_array()
                .cloned()
                .ok_or_else(|| ProxyError::invalid_response(&reply.observer, "`heartbeats` is not a list"))?;

            for heartbeat in heartbeats {
                let Some(key) = heartbeat.get("publicKey").and_then(Value::as_str) else {
                    continue;
                };
                by_key.entry(key.to_string()).or_insert(heartbeat);
            }
        }

        Ok(json!({ "heartbeats": by_key.into_values().collect::<Vec<_>>() }))
    }
}

pub struct NodeGroupProcessor {
    base: Arc<BaseProcessor>,
    heartbeat: Arc<CachedResource<Value>>,
}

impl Dispatch for NodeGroupProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl NodeGroupProcessor {
    pub fn new(base: Arc<BaseProcessor>, validity: Duration) -> Self {
        let fetcher = Arc::new(HeartbeatFetcher {
            base: Arc::clone(&base),
        });
        Self {
            base,
            heartbeat: Arc::new(CachedResource::new("heartbeat", validity, fetcher)),
        }
    }

    pub async fn get_heartbeat_data(&self) -> ProxyResult<Value> {
        self.heartbeat.get().await
    }

    /// The heartbeat cache, for refresh loop control and shutdown
    pub fn cache(&self) -> &Arc<CachedResource<Value>> {
        &self.heartbeat
    }
}
