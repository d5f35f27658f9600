//! Per-request tracing span.

use axum::{body::Body, http::Request, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{debug, info_span, Instrument, Span};

/// Wraps every request in an `api_request` span
#[derive(Clone, Default)]
pub struct TracingLayer;

impl TracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService { inner }
    }
}

#[derive(Clone)]
pub struct TracingService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TracingService<S>
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
        let mut inner = self.inner.clone();

        let span = info_span!(
            "api_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            api.version = version_segment(req.uri().path()).unwrap_or("default"),
            http.status_code = tracing::field::Empty,
            outcome = tracing::field::Empty,
            elapsed_ms = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(req).await;

                let current = Span::current();
                let outcome = match &result {
                    Ok(response) => {
                        let status = response.status();
                        current.record("http.status_code", status.as_u16());
                        if status.is_success() {
                            "ok"
                        } else {
                            "error"
                        }
                    }
                    Err(_) => "error",
                };
                current.record("outcome", outcome);
                current.record("elapsed_ms", started.elapsed().as_millis() as u64);
                debug!("Request served");

                result
            }
            .instrument(span),
        )
    }
}

/// First path segment when it looks like `v1_0` or `v_next`
fn version_segment(path: &str) -> Option<&str> {
    let first = path.trim_start_matches('/').split('/').next()?;
    crate::versions::looks_like_version(first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_version_segment() {
        assert_eq!(version_segment("/v1_0/address/x"), Some("v1_0"));
        assert_eq!(version_segment("/v_next/about"), Some("v_next"));
        assert_eq!(version_segment("/address/x"), None);
        assert_eq!(version_segment("/"), None);
    }

    #[tokio::test]
    async fn test_layer_passes_response_through() {
        let app = Router::new()
            .route("/about", get(|| async { "ok" }))
            .layer(TracingLayer::new());

        let response = app
            .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
    }
}
