//! HTTP middleware.
//!
//! Layer order (outermost first): Tracing -> Cors -> Metrics -> RateLimit -> Handler

pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::{EndpointMetrics, MetricsLayer, StatusMetrics};
pub use rate_limit::{RateLimitLayer, RateLimitState};
pub use tracing::TracingLayer;

use crate::domain::ProxyConfig;
use std::sync::Arc;

/// Shared middleware state built once per proxy
pub struct MiddlewareStack {
    pub rate_limit: Arc<RateLimitState>,
    pub metrics: Arc<StatusMetrics>,
}

impl MiddlewareStack {
    pub fn from_config(config: &ProxyConfig) -> Self {
        let settings = &config.general_settings;
        Self {
            rate_limit: Arc::new(RateLimitState::new(
                settings.rate_limit_requests_per_window,
                settings.rate_limit_window(),
            )),
            metrics: Arc::new(StatusMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<StatusMetrics> {
        Arc::clone(&self.metrics)
    }
}
