//! `/proof` endpoints.

use crate::api::extract::{respond, ApiJson, ApiPath, ApiResponse};
use crate::facade::ProxyFacade;
use crate::process::VerifyProofRequest;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/proof/root-hash/:root_hash/address/:address", get(get_proof))
        .route("/proof/address/:address", get(get_proof_current_root_hash))
        .route("/proof/verify", post(verify_proof))
}

async fn get_proof(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath((root_hash, address)): ApiPath<(String, String)>,
) -> ApiResponse {
    respond(facade.proof().get_proof(&root_hash, &address).await?)
}

async fn get_proof_current_root_hash(
    State(facade): State<Arc<ProxyFacade>>,
    ApiPath(address): ApiPath<String>,
) -> ApiResponse {
    respond(facade.proof().get_proof_current_root_hash(&address).await?)
}

async fn verify_proof(
    State(facade): State<Arc<ProxyFacade>>,
    ApiJson(request): ApiJson<VerifyProofRequest>,
) -> ApiResponse {
    respond(facade.proof().verify_proof(&request).await?)
}
