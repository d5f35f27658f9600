//! `/simulator` endpoints.

use crate::api::extract::{respond, respond_empty, ApiJson, ApiPath, ApiResponse};
use crate::domain::{AddressState, ApiError, FacadeError, ValidatorKeys};
use crate::facade::SimulatorFacade;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn routes() -> Router<Arc<SimulatorFacade>> {
    Router::new()
        .route("/generate-blocks", get(missing_block_count))
        .route("/generate-blocks/", get(missing_block_count))
        .route("/generate-blocks/:num", get(generate_blocks))
        .route(
            "/generate-blocks-until-epoch-reached/:epoch",
            post(generate_blocks_until_epoch_reached),
        )
        .route("/initial-wallets", get(get_initial_wallets))
        .route("/address/:address/set-state", post(set_key_value_for_address))
        .route("/set-state", post(set_state))
        .route("/set-state-overwrite", post(set_state_overwrite))
        .route("/add-keys", post(add_validator_keys))
        .route(
            "/force-reset-validator-statistics",
            post(force_reset_validator_statistics),
        )
        .route("/observers", get(get_observers_info))
}

async fn missing_block_count() -> ApiResponse {
    Err(ApiError::bad_request("invalid number of blocks: missing value"))
}

async fn generate_blocks(
    State(facade): State<Arc<SimulatorFacade>>,
    ApiPath(num): ApiPath<String>,
) -> ApiResponse {
    let num_of_blocks = num
        .trim()
        .parse::<i64>()
        .map_err(|e| ApiError::bad_request(format!("invalid number of blocks: {}", e)))?;

    match facade.generate_blocks(num_of_blocks).await {
        Ok(()) => respond_empty(),
        Err(e @ FacadeError::InvalidBlockCount(_)) => Err(ApiError::bad_request(e.to_string())),
        Err(e) => Err(ApiError::internal(format!("cannot generate blocks: {}", e))),
    }
}

async fn generate_blocks_until_epoch_reached(
    State(facade): State<Arc<SimulatorFacade>>,
    ApiPath(epoch): ApiPath<String>,
) -> ApiResponse {
    let target_epoch = epoch
        .trim()
        .parse::<i32>()
        .map_err(|e| ApiError::bad_request(format!("invalid epoch: {}", e)))?;

    facade
        .generate_blocks_until_epoch_is_reached(target_epoch)
        .await
        .map_err(|e| ApiError::internal(format!("cannot generate blocks until epoch: {}", e)))?;
    respond_empty()
}

async fn get_initial_wallets(State(facade): State<Arc<SimulatorFacade>>) -> ApiResponse {
    respond(facade.get_initial_wallet_keys())
}

async fn set_key_value_for_address(
    State(facade): State<Arc<SimulatorFacade>>,
    ApiPath(address): ApiPath<String>,
    ApiJson(pairs): ApiJson<BTreeMap<String, String>>,
) -> ApiResponse {
    facade.set_key_value_for_address(&address, pairs).await?;
    respond_empty()
}

async fn set_state(
    State(facade): State<Arc<SimulatorFacade>>,
    ApiJson(states): ApiJson<Vec<AddressState>>,
) -> ApiResponse {
    facade.set_state_multiple(&states).await?;
    respond_empty()
}

async fn set_state_overwrite(
    State(facade): State<Arc<SimulatorFacade>>,
    ApiJson(states): ApiJson<Vec<AddressState>>,
) -> ApiResponse {
    facade.set_state_multiple_overwrite(&states).await?;
    respond_empty()
}

async fn add_validator_keys(
    State(facade): State<Arc<SimulatorFacade>>,
    ApiJson(keys): ApiJson<ValidatorKeys>,
) -> ApiResponse {
    facade.add_validator_keys(&keys).await?;
    respond_empty()
}

async fn force_reset_validator_statistics(
    State(facade): State<Arc<SimulatorFacade>>,
) -> ApiResponse {
    facade.force_update_validator_statistics().await?;
    respond_empty()
}

async fn get_observers_info(State(facade): State<Arc<SimulatorFacade>>) -> ApiResponse {
    respond(facade.get_observers_info()?)
}
