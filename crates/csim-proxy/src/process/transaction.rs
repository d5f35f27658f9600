//! Transaction submission and lookup.

use crate::domain::{ProxyError, ProxyResult, Transaction};
use crate::process::base::{BaseProcessor, Dispatch};
use csim_sharding::{shard_display, ShardId};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct TransactionProcessor {
    base: Arc<BaseProcessor>,
    allow_entire_tx_pool_fetch: bool,
}

impl Dispatch for TransactionProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

impl TransactionProcessor {
    pub fn new(base: Arc<BaseProcessor>, allow_entire_tx_pool_fetch: bool) -> Self {
        Self {
            base,
            allow_entire_tx_pool_fetch,
        }
    }

    /// Send to the sender's shard
    #[instrument(skip_all, fields(sender = %tx.sender))]
    pub async fn send_transaction(&self, tx: &Transaction) -> ProxyResult<Value> {
        let shard = self.base.shard_id_for_address(&tx.sender)?;
        let body = serde_json::to_value(tx).map_err(|e| ProxyError::BadRequest(e.to_string()))?;
        let reply = self.post(shard, "/transaction/send", &body).await?;
        Ok(reply.into_data())
    }

    /// Send a batch, grouped per sender shard.
    ///
    /// Hashes are keyed by the transaction's index in the input. A shard
    /// that rejects its group is logged and left out of the count; when
    /// every group is rejected the last failure is returned.
    #[instrument(skip_all, fields(count = txs.len()))]
    pub async fn send_multiple_transactions(&self, txs: &[Transaction]) -> ProxyResult<Value> {
        let mut groups: BTreeMap<ShardId, Vec<(usize, &Transaction)>> = BTreeMap::new();
        for (index, tx) in txs.iter().enumerate() {
            let shard = self.base.shard_id_for_address(&tx.sender)?;
            groups.entry(shard).or_default().push((index, tx));
        }

        let mut sent = 0u64;
        let mut hashes = Map::new();
        let mut accepted = false;
        let mut last_error = None;
        for (shard, group) in groups {
            let batch: Vec<&Transaction> = group.iter().map(|(_, tx)| *tx).collect();
            let body = serde_json::to_value(&batch).map_err(|e| ProxyError::BadRequest(e.to_string()))?;

            let reply = match self.post(shard, "/transaction/send-multiple", &body).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(shard = %shard_display(shard), error = %e, "Batch rejected");
                    last_error = Some(e);
                    continue;
                }
            };
            accepted = true;

            sent += reply
                .data()
                .get("numOfSentTxs")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if let Some(shard_hashes) = reply.data().get("txsHashes").and_then(Value::as_object) {
                for (position, hash) in shard_hashes {
                    let original = position
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| group.get(i))
                        .map(|(index, _)| *index);
                    if let Some(index) = original {
                        hashes.insert(index.to_string(), hash.clone());
                    }
                }
            }
        }

        match last_error {
            Some(e) if !accepted => Err(ProxyError::aggregation("send multiple transactions", e)),
            _ => Ok(json!({ "numOfSentTxs": sent, "txsHashes": hashes })),
        }
    }

    pub async fn simulate_transaction(&self, tx: &Transaction) -> ProxyResult<Value> {
        let shard = self.base.shard_id_for_address(&tx.sender)?;
        let body = serde_json::to_value(tx).map_err(|e| ProxyError::BadRequest(e.to_string()))?;
        let reply = self.post(shard, "/transaction/simulate", &body).await?;
        Ok(reply.into_data())
    }

    pub async fn get_transaction(
        &self,
        hash: &str,
        sender: Option<&str>,
        with_results: bool,
    ) -> ProxyResult<Value> {
        let path = if with_results {
            format!("/transaction/{}?withResults=true", hash)
        } else {
            format!("/transaction/{}", hash)
        };
        self.lookup(hash, sender, &path).await
    }

    pub async fn get_transaction_status(
        &self,
        hash: &str,
        sender: Option<&str>,
    ) -> ProxyResult<Value> {
        self.lookup(hash, sender, &format!("/transaction/{}/status", hash))
            .await
    }

    /// Pool content of every shard
    pub async fn get_transactions_pool(&self, fields: Option<&str>) -> ProxyResult<Value> {
        if !self.allow_entire_tx_pool_fetch {
            return Err(ProxyError::FeatureDisabled("entire transactions pool fetch"));
        }

        let path = match fields {
            Some(fields) => {
                if !is_valid_fields_list(fields) {
                    return Err(ProxyError::BadRequest(format!("invalid fields `{}`", fields)));
                }
                format!("/transaction/pool?fields={}", fields)
            }
            None => "/transaction/pool".to_string(),
        };
        let replies = self.get_all(&path).await?;

        let mut pool = Map::new();
        for (shard, reply) in replies {
            pool.insert(shard.to_string(), reply.into_data());
        }
        Ok(json!({ "txPool": pool }))
    }

    /// With a sender the owning shard answers. Without one, shards are
    /// probed in order and the first that knows the hash wins. Only an
    /// observer answer moves on to the next shard; if some shard could not
    /// be reached and none knew the hash, the first such failure is returned.
    async fn lookup(&self, hash: &str, sender: Option<&str>, path: &str) -> ProxyResult<Value> {
        if hex::decode(hash).is_err() {
            return Err(ProxyError::BadRequest(format!("invalid transaction hash `{}`", hash)));
        }

        if let Some(sender) = sender.filter(|s| !s.is_empty()) {
            let shard = self.base.shard_id_for_address(sender)?;
            return Ok(self.get(shard, path).await?.into_data());
        }

        let mut failure = None;
        for shard in self.base.registry().shard_ids() {
            match self.get(*shard, path).await {
                Ok(reply) => return Ok(reply.into_data()),
                Err(e @ ProxyError::ObserverResponded { .. }) => {
                    debug!(shard = %shard_display(*shard), error = %e, "Transaction not found on shard")
                }
                Err(e) => {
                    warn!(shard = %shard_display(*shard), error = %e, "Transaction lookup failed on shard");
                    failure.get_or_insert(e);
                }
            }
        }

        Err(failure.unwrap_or_else(|| ProxyError::NotFound(format!("transaction {}", hash))))
    }
}

/// Comma separated field names
fn is_valid_fields_list(fields: &str) -> bool {
    !fields.is_empty() && fields.chars().all(|c| c.is_ascii_alphanumeric() || c == ',')
}
