//! `/address` endpoints.

use crate::api::extract::{respond, ApiPath, ApiQuery, ApiResponse};
use crate::domain::AccountQueryOptions;
use crate::facade::ProxyFacade;
use axum::{extract::State, routing::get, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/address/:address", get(get_account))
        .route("/address/:address/balance", get(get_balance))
        .route("/address/:address/nonce", get(get_nonce))
        .route("/address/:address/username", get(get_username))
        .route("/address/:address/shard", get(get_shard))
        .route("/address/:address/key/:key", get(get_value_for_key))
        .route("/address/:address/keys", get(get_key_value_pairs))
        .route("/address/:address/esdt", get(get_esdt_tokens))
        .route("/address/:address/esdt/:token", get(get_esdt_token))
}

async fn get_account(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(facade.account().get_account(&address, &options).await?)
}

async fn get_balance(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(facade.account().get_balance(&address, &options).await?)
}

async fn get_nonce(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(facade.account().get_nonce(&address, &options).await?)
}

async fn get_username(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(facade.account().get_username(&address, &options).await?)
}

async fn get_shard(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
) -> ApiResponse {
    respond(facade.account().get_shard_data(&address)?)
}

async fn get_value_for_key(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath((address, key)): ApiPath<(String, String)>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(
        facade
            .account()
            .get_value_for_key(&address, &key, &options)
            .await?,
    )
}

async fn get_key_value_pairs(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(facade.account().get_key_value_pairs(&address, &options).await?)
}

async fn get_esdt_tokens(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(facade.account().get_esdt_tokens(&address, &options).await?)
}

async fn get_esdt_token(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath((address, token)): ApiPath<(String, String)>,
    ApiQuery(options): ApiQuery<AccountQueryOptions>,
) -> ApiResponse {
    respond(
        facade
            .account()
            .get_esdt_token(&address, &token, &options)
            .await?,
    )
}
