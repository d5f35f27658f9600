//! # Base Request Processor
//!
//! Shard-aware dispatch to observers.
//!
//! For one shard the observers are tried in declared order. Only transport
//! failures (timeout, refused connection, unreadable body) move on to the
//! next observer; an HTTP answer of any status is final. When every observer
//! failed the error names the shard and the number of attempts.
//!
//! The health loop updates each node's synced flag. It is informational and
//! never changes dispatch order.

use crate::domain::{CloseError, ProxyError, ProxyResult, TransportError};
use crate::lifecycle::{BackgroundLoop, Closable};
use crate::observer::{DataAvailability, ObserverNode, ObserverRegistry};
use crate::ports::{AddressConverter, ObserverClient, ObserverResponse};
use async_trait::async_trait;
use csim_sharding::{shard_display, ShardCoordinator, ShardId};
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Path probed by the health loop
pub const NODE_STATUS_PATH: &str = "/node/status";

/// Successful observer answer
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverReply {
    /// Address of the observer that answered
    pub observer: String,
    /// Raw JSON body, normally a `{data, error, code}` envelope
    pub body: Value,
}

impl ObserverReply {
    /// The envelope's `data` field, `Null` when absent
    pub fn data(&self) -> &Value {
        self.body.get("data").unwrap_or(&Value::Null)
    }

    pub fn into_data(mut self) -> Value {
        match self.body.get_mut("data") {
            Some(data) => data.take(),
            None => Value::Null,
        }
    }

    /// Field `key` inside `data`, or an invalid-response error
    pub fn data_field(&self, key: &str) -> ProxyResult<&Value> {
        self.data()
            .get(key)
            .ok_or_else(|| ProxyError::invalid_response(&self.observer, format!("missing `{}`", key)))
    }
}

/// Shard-aware dispatcher shared by all domain processors
pub struct BaseProcessor {
    coordinator: ShardCoordinator,
    registry: Arc<ObserverRegistry>,
    client: Arc<dyn ObserverClient>,
    converter: Arc<dyn AddressConverter>,
    request_timeout: Duration,
    health: BackgroundLoop,
}

impl BaseProcessor {
    pub fn new(
        coordinator: ShardCoordinator,
        registry: Arc<ObserverRegistry>,
        client: Arc<dyn ObserverClient>,
        converter: Arc<dyn AddressConverter>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            coordinator,
            registry,
            client,
            converter,
            request_timeout,
            health: BackgroundLoop::new("nodes sync state checks"),
        }
    }

    pub fn coordinator(&self) -> &ShardCoordinator {
        &self.coordinator
    }

    pub fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    pub fn converter(&self) -> &dyn AddressConverter {
        self.converter.as_ref()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Shard owning `address`
    pub fn shard_id_for_address(&self, address: &str) -> ProxyResult<ShardId> {
        let raw = self
            .converter
            .decode(address)
            .map_err(|reason| ProxyError::InvalidAddress(format!("{}: {}", address, reason)))?;
        Ok(self.coordinator.compute_id(&raw))
    }

    /// GET `path` from the first responsive observer of `shard`
    #[instrument(skip_all, fields(shard = %shard_display(shard), path = %path))]
    pub async fn call_get_rest_end_point(
        &self,
        shard: ShardId,
        path: &str,
    ) -> ProxyResult<ObserverReply> {
        self.call_get_with_availability(shard, path, DataAvailability::Recent)
            .await
    }

    /// GET `path` from the nodes of `shard` able to serve `availability`
    pub async fn call_get_with_availability(
        &self,
        shard: ShardId,
        path: &str,
        availability: DataAvailability,
    ) -> ProxyResult<ObserverReply> {
        let nodes = self.nodes(shard, availability)?;
        self.try_in_order(shard, nodes, path, |url| async move {
            self.client.get(&url, self.request_timeout).await
        })
        .await
    }

    /// POST `body` to `path` on the first responsive observer of `shard`
    #[instrument(skip_all, fields(shard = %shard_display(shard), path = %path))]
    pub async fn call_post_rest_end_point(
        &self,
        shard: ShardId,
        path: &str,
        body: &Value,
    ) -> ProxyResult<ObserverReply> {
        let nodes = self.nodes(shard, DataAvailability::Recent)?;
        self.try_in_order(shard, nodes, path, |url| async move {
            self.client.post(&url, body, self.request_timeout).await
        })
        .await
    }

    /// GET `path` from every shard concurrently.
    ///
    /// All shards must answer; one failing shard fails the whole call.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn call_get_rest_end_point_for_all(
        &self,
        path: &str,
    ) -> ProxyResult<BTreeMap<ShardId, ObserverReply>> {
        let shards = self.registry.shard_ids();
        let results = join_all(
            shards
                .iter()
                .map(|shard| self.call_get_rest_end_point(*shard, path)),
        )
        .await;

        let mut replies = BTreeMap::new();
        for (shard, result) in shards.iter().zip(results) {
            match result {
                Ok(reply) => {
                    replies.insert(*shard, reply);
                }
                Err(e) => {
                    return Err(ProxyError::aggregation(
                        "all shards request",
                        format!("shard {}: {}", shard_display(*shard), e),
                    ))
                }
            }
        }
        Ok(replies)
    }

    /// GET `path` from one specific node, no fallback
    pub async fn call_get_on_observer(
        &self,
        node: &ObserverNode,
        path: &str,
    ) -> ProxyResult<ObserverReply> {
        let url = node.url(path);
        match self.with_timeout(&url, self.client.get(&url, self.request_timeout)).await {
            Ok(response) => interpret(node, response),
            Err(e) => Err(ProxyError::AllObserversFailed {
                shard: node.shard_id(),
                attempts: 1,
                last_error: e.to_string(),
            }),
        }
    }

    fn nodes(
        &self,
        shard: ShardId,
        availability: DataAvailability,
    ) -> ProxyResult<&[Arc<ObserverNode>]> {
        if !self.coordinator.is_known(shard) {
            return Err(ProxyError::UnknownShard(shard));
        }
        let nodes = self
            .registry
            .observers_for_data_availability(shard, availability);
        if nodes.is_empty() {
            return Err(ProxyError::NoObservers(shard));
        }
        Ok(nodes)
    }

    async fn try_in_order<F, Fut>(
        &self,
        shard: ShardId,
        nodes: &[Arc<ObserverNode>],
        path: &str,
        call: F,
    ) -> ProxyResult<ObserverReply>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<ObserverResponse, TransportError>>,
    {
        let mut last_error = None;

        for (attempt, node) in nodes.iter().enumerate() {
            let url = node.url(path);
            match self.with_timeout(&url, call(url.clone())).await {
                Ok(response) => {
                    debug!(observer = node.address(), attempt = attempt + 1, "Observer answered");
                    return interpret(node, response);
                }
                Err(e) => {
                    warn!(
                        observer = node.address(),
                        path,
                        attempt = attempt + 1,
                        error = %e,
                        "Observer request failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(ProxyError::AllObserversFailed {
            shard,
            attempts: nodes.len(),
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn with_timeout<Fut>(&self, url: &str, call: Fut) -> Result<ObserverResponse, TransportError>
    where
        Fut: Future<Output = Result<ObserverResponse, TransportError>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                url: url.to_string(),
                timeout: self.request_timeout,
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NODE HEALTH
    // ═══════════════════════════════════════════════════════════════════════

    /// Probe every node once and update its synced flag
    pub async fn check_nodes_sync_state(&self) {
        let nodes: Vec<_> = self
            .registry
            .all_observers()
            .into_iter()
            .chain(self.registry.all_full_history_nodes())
            .collect();

        let probes = nodes.iter().map(|node| async move {
            let synced = match self.call_get_on_observer(node, NODE_STATUS_PATH).await {
                Ok(reply) => is_synced_status(reply.data()),
                Err(e) => {
                    debug!(observer = node.address(), error = %e, "Sync probe failed");
                    false
                }
            };
            if synced != node.is_synced() {
                info!(
                    observer = node.address(),
                    shard = %shard_display(node.shard_id()),
                    synced,
                    "Observer sync state changed"
                );
            }
            node.set_synced(synced);
        });
        join_all(probes).await;
    }

    /// Start the periodic health loop
    pub fn start_nodes_sync_state_checks(self: &Arc<Self>, interval: Duration) -> bool {
        let weak = Arc::downgrade(self);
        self.health.start(interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(processor) = weak.upgrade() {
                    processor.check_nodes_sync_state().await;
                }
            }
        })
    }
}

impl Closable for BaseProcessor {
    fn name(&self) -> &str {
        "base processor"
    }

    fn close(&self) -> Result<(), CloseError> {
        self.health.stop();
        Ok(())
    }
}

/// Shared dispatch capability of every domain processor
#[async_trait]
pub trait Dispatch: Send + Sync {
    fn base(&self) -> &BaseProcessor;

    async fn get(&self, shard: ShardId, path: &str) -> ProxyResult<ObserverReply> {
        self.base().call_get_rest_end_point(shard, path).await
    }

    async fn post(&self, shard: ShardId, path: &str, body: &Value) -> ProxyResult<ObserverReply> {
        self.base().call_post_rest_end_point(shard, path, body).await
    }

    async fn get_all(&self, path: &str) -> ProxyResult<BTreeMap<ShardId, ObserverReply>> {
        self.base().call_get_rest_end_point_for_all(path).await
    }
}

fn interpret(node: &ObserverNode, response: ObserverResponse) -> ProxyResult<ObserverReply> {
    if response.is_success() {
        return Ok(ObserverReply {
            observer: node.address().to_string(),
            body: response.body,
        });
    }

    let message = match &response.body {
        Value::Object(map) => map
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
    .unwrap_or_else(|| format!("observer answered with status {}", response.status));

    Err(ProxyError::ObserverResponded {
        observer: node.address().to_string(),
        status: response.status,
        message,
    })
}

/// Sync rule applied to a `/node/status` payload
fn is_synced_status(data: &Value) -> bool {
    let metrics = data.get("metrics").unwrap_or(data);
    let as_u64 = |key: &str| metrics.get(key).and_then(Value::as_u64);

    if as_u64("erd_is_syncing") == Some(0) {
        return true;
    }
    match (as_u64("erd_nonce"), as_u64("erd_probable_highest_nonce")) {
        (Some(nonce), Some(highest)) => highest.saturating_sub(nonce) <= 1,
        _ => false,
    }
}
