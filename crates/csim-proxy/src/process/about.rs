//! Proxy build information and observer versions.

use crate::domain::ProxyResult;
use crate::process::base::{BaseProcessor, NODE_STATUS_PATH};
use csim_sharding::shard_display;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const UNDEFINED: &str = "undefined";

pub struct AboutProcessor {
    base: Arc<BaseProcessor>,
    app_version: String,
    commit_id: String,
}

impl AboutProcessor {
    pub fn new(base: Arc<BaseProcessor>) -> Self {
        Self {
            base,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            commit_id: option_env!("CSIM_COMMIT_ID").unwrap_or(UNDEFINED).to_string(),
        }
    }

    pub fn get_about_info(&self) -> Value {
        json!({
            "appVersion": self.app_version,
            "commitID": self.commit_id,
        })
    }

    /// `erd_app_version` of every observer, grouped by shard.
    ///
    /// Unreachable observers are left out.
    pub async fn get_nodes_versions(&self) -> ProxyResult<Value> {
        let observers = self.base.registry().all_observers();
        let probes = observers.iter().map(|node| async move {
            match self.base.call_get_on_observer(node, NODE_STATUS_PATH).await {
                Ok(reply) => reply
                    .data()
                    .get("metrics")
                    .and_then(|metrics| metrics.get("erd_app_version"))
                    .and_then(Value::as_str)
                    .map(|version| (node.shard_id(), version.to_string())),
                Err(e) => {
                    debug!(observer = node.address(), error = %e, "Version probe failed");
                    None
                }
            }
        });

        let mut versions: BTreeMap<_, Vec<Value>> = BTreeMap::new();
        for (shard, version) in join_all(probes).await.into_iter().flatten() {
            versions.entry(shard).or_default().push(Value::String(version));
        }

        let by_shard: Map<String, Value> = versions
            .into_iter()
            .map(|(shard, list)| (shard_display(shard), Value::Array(list)))
            .collect();
        Ok(json!({ "nodesVersions": by_shard }))
    }

    /// Address, shard and sync flag of every observer
    pub fn get_observers_health(&self) -> Value {
        let observers: Vec<Value> = self
            .base
            .registry()
            .all_observers()
            .iter()
            .map(|node| {
                json!({
                    "address": node.address(),
                    "shardId": node.shard_id(),
                    "isSynced": node.is_synced(),
                    "isSnapshotless": node.is_snapshotless(),
                })
            })
            .collect();
        json!({ "observers": observers })
    }
}
