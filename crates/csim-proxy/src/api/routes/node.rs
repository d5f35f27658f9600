//! `/node` and `/validator` endpoints.

use crate::api::extract::{respond, ApiResponse};
use crate::facade::ProxyFacade;
use axum::{extract::State, routing::get, Router};
use std::sync::Arc;

pub fn node_routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/node/heartbeatstatus", get(get_heartbeat_data))
        .route("/node/observers", get(get_observers_health))
}

pub fn validator_routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/validator/statistics", get(get_validator_statistics))
        .route("/validator/auction", get(get_auction_list))
}

async fn get_heartbeat_data(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.node_group().get_heartbeat_data().await?)
}

async fn get_observers_health(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.about().get_observers_health())
}

async fn get_validator_statistics(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.validator_stats().get_validator_statistics().await?)
}

async fn get_auction_list(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.validator_stats().get_auction_list().await?)
}
