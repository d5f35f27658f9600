//! Per-endpoint request metrics.
//!
//! Counters are keyed by the matched route template so that path parameters
//! do not explode the key space.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Request, StatusCode},
    response::Response,
};
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Key for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

#[derive(Default)]
struct EndpointCounters {
    requests: AtomicU64,
    errors: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Snapshot of one endpoint's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointMetrics {
    pub num_requests: u64,
    pub num_errors: u64,
    pub total_response_time_ms: u64,
}

/// Proxy request metrics
#[derive(Default)]
pub struct StatusMetrics {
    endpoints: DashMap<String, EndpointCounters>,
    requests_total: AtomicU64,
    requests_error: AtomicU64,
    rate_limit_rejected: AtomicU64,
}

impl StatusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a served request
    pub fn record_request(&self, endpoint: &str, status: StatusCode, latency_ms: u64) {
        let failed = status.is_client_error() || status.is_server_error();

        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.requests_error.fetch_add(1, Ordering::Relaxed);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.rate_limit_rejected.fetch_add(1, Ordering::Relaxed);
        }

        if !self.endpoints.contains_key(endpoint) {
            self.endpoints.entry(endpoint.to_string()).or_default();
        }
        if let Some(counters) = self.endpoints.get(endpoint) {
            counters.requests.fetch_add(1, Ordering::Relaxed);
            if failed {
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
            counters
                .total_latency_ms
                .fetch_add(latency_ms, Ordering::Relaxed);
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn rate_limit_rejected(&self) -> u64 {
        self.rate_limit_rejected.load(Ordering::Relaxed)
    }

    /// Sorted snapshot of every endpoint
    pub fn snapshot(&self) -> BTreeMap<String, EndpointMetrics> {
        self.endpoints
            .iter()
            .map(|entry| {
                let counters = entry.value();
                (
                    entry.key().clone(),
                    EndpointMetrics {
                        num_requests: counters.requests.load(Ordering::Relaxed),
                        num_errors: counters.errors.load(Ordering::Relaxed),
                        total_response_time_ms: counters.total_latency_ms.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }

    /// `{"metrics": {endpoint: {num_requests, num_errors, total_response_time_ms}}}`
    pub fn to_json(&self) -> Value {
        let endpoints: Map<String, Value> = self
            .snapshot()
            .into_iter()
            .map(|(endpoint, metrics)| {
                (
                    endpoint,
                    json!({
                        "num_requests": metrics.num_requests,
                        "num_errors": metrics.num_errors,
                        "total_response_time_ms": metrics.total_response_time_ms,
                    }),
                )
            })
            .collect();
        json!({ "metrics": endpoints })
    }

    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# HELP csim_proxy_requests_total Total number of proxy requests\n\
             # TYPE csim_proxy_requests_total counter\n\
             csim_proxy_requests_total {}\n",
            self.requests_total.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP csim_proxy_requests_error_total Failed requests\n\
             # TYPE csim_proxy_requests_error_total counter\n\
             csim_proxy_requests_error_total {}\n",
            self.requests_error.load(Ordering::Relaxed)
        ));

        output.push_str(&format!(
            "# HELP csim_proxy_rate_limit_rejected_total Rate limited requests\n\
             # TYPE csim_proxy_rate_limit_rejected_total counter\n\
             csim_proxy_rate_limit_rejected_total {}\n",
            self.rate_limit_rejected.load(Ordering::Relaxed)
        ));

        let snapshot = self.snapshot();
        let families: [(&str, &str, fn(&EndpointMetrics) -> u64); 3] = [
            ("csim_proxy_endpoint_requests_total", "Requests per endpoint", |m| m.num_requests),
            ("csim_proxy_endpoint_errors_total", "Failed requests per endpoint", |m| m.num_errors),
            (
                "csim_proxy_endpoint_response_time_ms_total",
                "Accumulated response time per endpoint",
                |m| m.total_response_time_ms,
            ),
        ];
        for (name, help, value) in families {
            output.push_str(&format!("# HELP {} {}\n# TYPE {} counter\n", name, help, name));
            for (endpoint, metrics) in &snapshot {
                output.push_str(&format!(
                    "{}{{endpoint=\"{}\"}} {}\n",
                    name,
                    endpoint.replace('"', "\\\""),
                    value(metrics)
                ));
            }
        }

        output
    }
}

/// Records every response into [`StatusMetrics`]
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<StatusMetrics>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<StatusMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<StatusMetrics>,
}

impl<S> Service<Request<Body>> for MetricsService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let metrics = Arc::clone(&self.metrics);
        let mut inner = self.inner.clone();
        let endpoint = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

        Box::pin(async move {
            let started = Instant::now();
            let result = inner.call(req).await;
            let status = match &result {
                Ok(response) => response.status(),
                Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            metrics.record_request(&endpoint, status, started.elapsed().as_millis() as u64);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_record_request() {
        let metrics = StatusMetrics::new();
        metrics.record_request("/address/:address", StatusCode::OK, 5);
        metrics.record_request("/address/:address", StatusCode::BAD_REQUEST, 3);
        metrics.record_request("/about", StatusCode::TOO_MANY_REQUESTS, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot["/address/:address"],
            EndpointMetrics {
                num_requests: 2,
                num_errors: 1,
                total_response_time_ms: 8,
            }
        );
        assert_eq!(metrics.requests_total(), 3);
        assert_eq!(metrics.rate_limit_rejected(), 1);

        let json = metrics.to_json();
        assert_eq!(json["metrics"]["/about"]["num_errors"], 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = StatusMetrics::new();
        metrics.record_request("/about", StatusCode::OK, 1);
        let text = metrics.to_prometheus();

        assert!(text.contains("# TYPE csim_proxy_requests_total counter"));
        assert!(text.contains("csim_proxy_requests_total 1\n"));
        assert!(text.contains("csim_proxy_endpoint_requests_total{endpoint=\"/about\"} 1\n"));
    }

    #[tokio::test]
    async fn test_layer_keys_by_route_template() {
        let metrics = Arc::new(StatusMetrics::new());
        let app = Router::new()
            .route("/address/:address", get(|| async { "ok" }))
            .layer(MetricsLayer::new(Arc::clone(&metrics)));

        for address in ["aa", "bb"] {
            let request = Request::builder()
                .uri(format!("/address/{}", address))
                .body(Body::empty())
                .unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        assert_eq!(metrics.snapshot()["/address/:address"].num_requests, 2);
    }
}
