//! HTTP surface.
//!
//! Every registered version is served under `/{version}` with only its
//! enabled endpoint groups; the default version is also served at the root.
//! Requests naming an unregistered version token are answered by the
//! default version. Simulator endpoints are unversioned under `/simulator`.

pub mod extract;
pub mod routes;

use crate::domain::{ApiError, CorsConfig};
use crate::facade::{ProxyFacade, SimulatorFacade};
use crate::middleware::{create_cors_layer, MetricsLayer, MiddlewareStack, RateLimitLayer, TracingLayer};
use crate::versions::{looks_like_version, VersionEntry, VersionsRegistry, ENDPOINT_GROUPS};
use axum::{
    extract::Request,
    http::Uri,
    response::{IntoResponse, Response},
    Router,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;
use tracing::debug;

pub use extract::{respond, ApiJson, ApiPath, ApiQuery, ApiResponse};

/// Routes of one version: every group it leaves enabled
pub fn version_router(entry: &VersionEntry<ProxyFacade>) -> Router {
    ENDPOINT_GROUPS
        .iter()
        .filter(|group| entry.is_group_enabled(group))
        .filter_map(|group| routes::group_routes(group))
        .fold(Router::new(), |router, group| router.merge(group))
        .with_state(Arc::clone(entry.facade()))
}

/// Full application router with middleware
pub fn build_router(
    versions: &VersionsRegistry<ProxyFacade>,
    simulator: Arc<SimulatorFacade>,
    middleware: &MiddlewareStack,
    cors: &CorsConfig,
) -> Router {
    let mut app = Router::new();
    let mut registered = BTreeSet::new();

    for (name, entry) in versions.get_all_versions() {
        app = app.nest(&format!("/{}", name), version_router(entry));
        registered.insert(name.to_string());
    }

    let (_, default_entry) = versions.resolve(None);
    let default_router = version_router(default_entry);
    let registered = Arc::new(registered);

    app.merge(default_router.clone())
        .nest(
            "/simulator",
            routes::simulator::routes().with_state(simulator),
        )
        .fallback(move |req: Request| {
            let default_router = default_router.clone();
            let registered = Arc::clone(&registered);
            async move { fallback(default_router, &registered, req).await }
        })
        .layer(RateLimitLayer::new(Arc::clone(&middleware.rate_limit)))
        .layer(MetricsLayer::new(middleware.metrics()))
        .layer(create_cors_layer(cors))
        .layer(TracingLayer::new())
}

/// Unregistered version tokens go to the default version; anything else is 404
async fn fallback(default_router: Router, registered: &BTreeSet<String>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();

    if looks_like_version(first) && !registered.contains(first) {
        if let Some(uri) = strip_first_segment(req.uri(), first) {
            debug!(version = first, path = %path, "Unknown API version, using default");
            let (mut parts, body) = req.into_parts();
            parts.uri = uri;
            let forwarded = Request::from_parts(parts, body);
            return match default_router.oneshot(forwarded).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
        }
    }

    ApiError::not_found(format!("endpoint {} not found", path)).into_response()
}

fn strip_first_segment(uri: &Uri, segment: &str) -> Option<Uri> {
    let rest = uri.path().trim_start_matches('/').strip_prefix(segment)?;
    let rest = if rest.is_empty() { "/" } else { rest };
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", rest, query),
        None => rest.to_string(),
    };
    path_and_query.parse().ok()
}
