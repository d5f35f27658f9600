//! `/block`, `/blocks` and `/hyperblock` endpoints.

use crate::api::extract::{respond, ApiPath, ApiQuery, ApiResponse};
use crate::facade::ProxyFacade;
use axum::{extract::State, routing::get, Router};
use csim_sharding::ShardId;
use serde::Deserialize;
use std::sync::Arc;

pub fn block_routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/block/:shard/by-nonce/:nonce", get(get_block_by_nonce))
        .route("/block/:shard/by-hash/:hash", get(get_block_by_hash))
}

pub fn blocks_routes() -> Router<Arc<ProxyFacade>> {
    Router::new().route("/blocks/by-round/:round", get(get_blocks_by_round))
}

pub fn hyperblock_routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/hyperblock/by-nonce/:nonce", get(get_hyperblock_by_nonce))
        .route("/hyperblock/by-hash/:hash", get(get_hyperblock_by_hash))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockQuery {
    #[serde(default)]
    with_txs: bool,
}

async fn get_block_by_nonce(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath((shard, nonce)): ApiPath<(ShardId, u64)>,
    ApiQuery(query): ApiQuery<BlockQuery>,
) -> ApiResponse {
    respond(
        facade
            .block()
            .get_block_by_nonce(shard, nonce, query.with_txs)
            .await?,
    )
}

async fn get_block_by_hash(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath((shard, hash)): ApiPath<(ShardId, String)>,
    ApiQuery(query): ApiQuery<BlockQuery>,
) -> ApiResponse {
    respond(
        facade
            .block()
            .get_block_by_hash(shard, &hash, query.with_txs)
            .await?,
    )
}

async fn get_blocks_by_round(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(round): ApiPath<u64>,
    ApiQuery(query): ApiQuery<BlockQuery>,
) -> ApiResponse {
    respond(facade.block().get_blocks_by_round(round, query.with_txs).await?)
}

async fn get_hyperblock_by_nonce(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(nonce): ApiPath<u64>,
) -> ApiResponse {
    respond(facade.block().get_hyperblock_by_nonce(nonce).await?)
}

async fn get_hyperblock_by_hash(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(hash): ApiPath<String>,
) -> ApiResponse {
    respond(facade.block().get_hyperblock_by_hash(&hash).await?)
}
