//! `/vm-values` endpoints.

use crate::api::extract::{respond, ApiJson, ApiResponse};
use crate::domain::ScQuery;
use crate::facade::ProxyFacade;
use axum::{extract::State, routing::post, Router};
use serde_json::json;
use std::sync::Arc;

pub fn routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/vm-values/query", post(execute_query))
        .route("/vm-values/hex", post(query_hex))
        .route("/vm-values/string", post(query_string))
        .route("/vm-values/int", post(query_int))
}

async fn execute_query(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(query): ApiJson<ScQuery>,
) -> ApiResponse {
    respond(facade.sc_query().execute_query(&query).await?)
}

async fn query_hex(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(query): ApiJson<ScQuery>,
) -> ApiResponse {
    respond(json!({ "data": facade.sc_query().query_hex(&query).await? }))
}

async fn query_string(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(query): ApiJson<ScQuery>,
) -> ApiResponse {
    respond(json!({ "data": facade.sc_query().query_string(&query).await? }))
}

async fn query_int(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(query): ApiJson<ScQuery>,
) -> ApiResponse {
    respond(json!({ "data": facade.sc_query().query_int(&query).await? }))
}
