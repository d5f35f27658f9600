//! `/status` and `/about` endpoints.

use crate::api::extract::{respond, ApiResponse};
use crate::facade::ProxyFacade;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn status_routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/status/metrics", get(get_metrics))
        .route("/status/prometheus-metrics", get(get_prometheus_metrics))
}

pub fn about_routes() -> Router<Arc<ProxyFacade>> {
    Router::new()
        .route("/about", get(get_about_info))
        .route("/about/nodes-versions", get(get_nodes_versions))
}

async fn get_metrics(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.status().get_metrics())
}

async fn get_prometheus_metrics(State(facade): State<Arc<ProxyFacade>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        facade.status().get_prometheus_metrics(),
    )
}

async fn get_about_info(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.about().get_about_info())
}

async fn get_nodes_versions(State(facade): State<Arc<ProxyFacade>>) -> ApiResponse {
    respond(facade.about().get_nodes_versions().await?)
}
