//! `/network` endpoints.

use crate::api::extract::{respond, ApiPath, ApiResponse};
use crate::facade::ProxyFacade;
use axum::{extract::State, routing::get, Router};
use csim_sharding::ShardId;
use serde_json::json;
use std::sync::Arc;

pub fn routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/network/status/:shard", get(get_network_status))
        .route("/network/config", get(get_network_config))
        .route("/network/economics", get(get_economics))
        .route("/network/enable-epochs", get(get_enable_epochs))
        .route("/network/esdts", get(get_all_issued_esdts))
        .route("/network/esdt/fungible-tokens", get(get_fungible_tokens))
        .route("/network/esdt/semi-fungible-tokens", get(get_semi_fungible_tokens))
        .route("/network/esdt/non-fungible-tokens", get(get_non_fungible_tokens))
        .route("/network/esdt/supply/:token", get(get_esdt_supply))
        .route(
            "/network/latest-synchronized-hyperblock-nonce",
            get(get_latest_synchronized_hyperblock_nonce),
        )
}

async fn get_network_status(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(shard): ApiPath<ShardId>,
) -> ApiResponse {
    respond(facade.node_status().get_network_status(shard).await?)
}

async fn get_network_config(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.node_status().get_network_config().await?)
}

async fn get_economics(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.node_status().get_economics().await?)
}

async fn get_enable_epochs(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.node_status().get_enable_epochs().await?)
}

async fn get_all_issued_esdts(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.node_status().get_all_issued_esdts(None).await?)
}

async fn get_fungible_tokens(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(
        facade
            .node_status()
            .get_all_issued_esdts(Some("fungible-tokens"))
            .await?,
    )
}

async fn get_semi_fungible_tokens(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(
        facade
            .node_status()
            .get_all_issued_esdts(Some("semi-fungible-tokens"))
            .await?,
    )
}

async fn get_non_fungible_tokens(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(
        facade
            .node_status()
            .get_all_issued_esdts(Some("non-fungible-tokens"))
            .await?,
    )
}

async fn get_esdt_supply(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(token): ApiPath<String>,
) -> ApiResponse {
    respond(facade.esdt_supply().get_esdt_supply(&token).await?)
}

async fn get_latest_synchronized_hyperblock_nonce(
    State(facade): State<Arc<ProxyFacade>>,
) -> ApiResponse {
    let nonce = facade
        .node_status()
        .get_latest_fully_synchronized_hyperblock_nonce()
        .await?;
    respond(json!({ "nonce": nonce }))
}
