//! `/transaction` endpoints.

use crate::api::extract::{respond, ApiJson, ApiPath, ApiQuery, ApiResponse};
use crate::domain::Transaction;
use crate::facade::ProxyFacade;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/transaction/send", post(send_transaction))
        .route("/transaction/send-multiple", post(send_multiple_transactions))
        .route("/transaction/simulate", post(simulate_transaction))
        .route("/transaction/send-user-funds", post(send_user_funds))
        .route("/transaction/pool", get(get_transactions_pool))
        .route("/transaction/:hash", get(get_transaction))
        .route("/transaction/:hash/status", get(get_transaction_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionQuery {
    sender: Option<String>,
    #[serde(default)]
    with_results: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PoolQuery {
    fields: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FundsRequest {
    receiver: String,
}

async fn send_transaction(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(tx): ApiJson<Transaction>,
) -> ApiResponse {
    respond(facade.transaction().send_transaction(&tx).await?)
}

async fn send_multiple_transactions(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(txs): ApiJson<Vec<Transaction>>,
) -> ApiResponse {
    respond(facade.transaction().send_multiple_transactions(&txs).await?)
}

async fn simulate_transaction(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(tx): ApiJson<Transaction>,
) -> ApiResponse {
    respond(facade.transaction().simulate_transaction(&tx).await?)
}

async fn send_user_funds(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(request): ApiJson<FundsRequest>,
) -> ApiResponse {
    respond(facade.faucet().send_funds(&request.receiver).await?)
}

async fn get_transactions_pool(
    State(facade): State<Arc<ProxyFacade>>,
    ApiQuery(query): ApiQuery<PoolQuery>,
) -> ApiResponse {
    respond(
        facade
            .transaction()
            .get_transactions_pool(query.fields.as_deref())
            .await?,
    )
}

async fn get_transaction(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(hash): ApiPath<String>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResponse {
    respond(
        facade
            .transaction()
            .get_transaction(&hash, query.sender.as_deref(), query.with_results)
            .await?,
    )
}

async fn get_transaction_status(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(hash): ApiPath<String>,
    ApiQuery(query): ApiQuery<TransactionQuery>,
) -> ApiResponse {
    respond(
        facade
            .transaction()
            .get_transaction_status(&hash, query.sender.as_deref())
            .await?,
    )
}
