//! CORS layer built from the proxy configuration.

use crate::domain::CorsConfig;
use axum::http::{header, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::very_permissive();
    }

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    cors.max_age(Duration::from_secs(config.max_age))
}
