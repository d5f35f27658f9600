//! Blocks, hyperblocks and blocks by round.

use crate::domain::{ProxyError, ProxyResult};
use crate::observer::DataAvailability;
use crate::process::base::{BaseProcessor, Dispatch};
use csim_sharding::{ShardId, METACHAIN_SHARD_ID};
use futures::future::try_join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub struct BlockProcessor {
    base: Arc<BaseProcessor>,
}

impl Dispatch for BlockProcessor {
    fn base(&self) -> &BaseProcessor {
        &self.base
    }
}

fn with_txs_query(with_txs: bool) -> &'static str {
    if with_txs {
        "?withTxs=true"
    } else {
        ""
    }
}

impl BlockProcessor {
    pub fn new(base: Arc<BaseProcessor>) -> Self {
        Self { base }
    }

    pub async fn get_block_by_nonce(
        &self,
        shard: ShardId,
        nonce: u64,
        with_txs: bool,
    ) -> ProxyResult<Value> {
        let path = format!("/block/by-nonce/{}{}", nonce, with_txs_query(with_txs));
        self.historical(shard, &path).await
    }

    pub async fn get_block_by_hash(
        &self,
        shard: ShardId,
        hash: &str,
        with_txs: bool,
    ) -> ProxyResult<Value> {
        if hex::decode(hash).is_err() {
            return Err(ProxyError::BadRequest(format!("invalid block hash `{}`", hash)));
        }
        let path = format!("/block/by-hash/{}{}", hash, with_txs_query(with_txs));
        self.historical(shard, &path).await
    }

    /// Metachain block plus every shard block it notarizes
    #[instrument(skip(self))]
    pub async fn get_hyperblock_by_nonce(&self, nonce: u64) -> ProxyResult<Value> {
        let meta = self
            .get_block_by_nonce(METACHAIN_SHARD_ID, nonce, true)
            .await?;
        self.build_hyperblock(meta).await
    }

    pub async fn get_hyperblock_by_hash(&self, hash: &str) -> ProxyResult<Value> {
        let meta = self
            .get_block_by_hash(METACHAIN_SHARD_ID, hash, true)
            .await?;
        self.build_hyperblock(meta).await
    }

    /// Blocks of every shard for `round`. Any failing shard fails the call.
    pub async fn get_blocks_by_round(&self, round: u64, with_txs: bool) -> ProxyResult<Value> {
        let path = format!("/blocks/by-round/{}{}", round, with_txs_query(with_txs));
        let replies = self.get_all(&path).await?;

        let mut blocks = Vec::new();
        for (_, reply) in replies {
            match reply.into_data().get_mut("blocks").map(Value::take) {
                Some(Value::Array(shard_blocks)) => blocks.extend(shard_blocks),
                Some(Value::Null) | None => {}
                Some(other) => blocks.push(other),
            }
        }
        Ok(json!({ "blocks": blocks }))
    }

    async fn historical(&self, shard: ShardId, path: &str) -> ProxyResult<Value> {
        let reply = self
            .base
            .call_get_with_availability(shard, path, DataAvailability::AllHistory)
            .await?;
        Ok(reply.into_data())
    }

    async fn build_hyperblock(&self, mut meta: Value) -> ProxyResult<Value> {
        let block = meta
            .get_mut("block")
            .map(Value::take)
            .ok_or_else(|| ProxyError::aggregation("hyperblock", "metachain block missing"))?;

        let notarized: Vec<(ShardId, String)> = block
            .get("notarizedBlocks")
            .or_else(|| block.get("shardBlocks"))
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let shard = entry.get("shard").and_then(Value::as_u64)?;
                        let hash = entry.get("hash").and_then(Value::as_str)?;
                        Some((u32::try_from(shard).ok()?, hash.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let shard_blocks = try_join_all(
            notarized
                .iter()
                .map(|(shard, hash)| self.get_block_by_hash(*shard, hash, true)),
        )
        .await
        .map_err(|e| ProxyError::aggregation("hyperblock", e))?;

        let mut transactions = Vec::new();
        collect_transactions(&block, &mut transactions);
        for shard_block in &shard_blocks {
            if let Some(inner) = shard_block.get("block") {
                collect_transactions(inner, &mut transactions);
            }
        }

        let field = |key: &str| block.get(key).cloned().unwrap_or(Value::Null);
        Ok(json!({
            "hyperblock": {
                "hash": field("hash"),
                "prevBlockHash": field("prevBlockHash"),
                "nonce": field("nonce"),
                "round": field("round"),
                "epoch": field("epoch"),
                "timestamp": field("timestamp"),
                "numTxs": transactions.len(),
                "shardBlocks": notarized
                    .iter()
                    .map(|(shard, hash)| json!({"shard": shard, "hash": hash}))
                    .collect::<Vec<_>>(),
                "transactions": transactions,
            }
        }))
    }
}

fn collect_transactions(block: &Value, out: &mut Vec<Value>) {
    let Some(mini_blocks) = block.get("miniBlocks").and_then(Value::as_array) else {
        return;
    };
    for mini_block in mini_blocks {
        if let Some(txs) = mini_block.get("transactions").and_then(Value::as_array) {
            out.extend(txs.iter().cloned());
        }
    }
}
