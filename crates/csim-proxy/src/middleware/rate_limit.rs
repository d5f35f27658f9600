//! Per-IP rate limiting with a fixed budget per window.
//!
//! Each client IP gets its own governor bucket refilling `budget` requests
//! evenly over the configured window. Stale buckets are dropped by a cleanup
//! loop that is a closable component.

use crate::domain::{ApiError, CloseError};
use crate::lifecycle::{BackgroundLoop, Closable};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderValue, Request},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracing::{debug, warn};

/// Token bucket entry for an IP address
struct TokenBucket {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    last_access: Instant,
}

impl TokenBucket {
    fn new(quota: Quota) -> Self {
        Self {
            limiter: RateLimiter::direct(quota),
            last_access: Instant::now(),
        }
    }

    fn check(&mut self) -> Result<(), Duration> {
        self.last_access = Instant::now();
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

/// Rate limiter state shared across requests
pub struct RateLimitState {
    buckets: DashMap<IpAddr, TokenBucket>,
    quota: Option<Quota>,
    window: Duration,
    cleanup: BackgroundLoop,
}

impl RateLimitState {
    /// `budget` requests per `window`; a zero budget disables limiting
    pub fn new(budget: u32, window: Duration) -> Self {
        let quota = NonZeroU32::new(budget).and_then(|burst| {
            let period = window.checked_div(budget)?;
            Quota::with_period(period).map(|quota| quota.allow_burst(burst))
        });

        Self {
            buckets: DashMap::new(),
            quota,
            window,
            cleanup: BackgroundLoop::new("rate limiter cleanup"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.quota.is_some()
    }

    /// Check if request should be allowed
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let Some(quota) = self.quota else {
            return Ok(());
        };

        let mut bucket = self.buckets.entry(ip).or_insert_with(|| {
            debug!(ip = %ip, "Creating new rate limit bucket");
            TokenBucket::new(quota)
        });
        bucket.check()
    }

    /// Drop buckets idle for longer than `max_age`
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_access) <= max_age);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Clean idle buckets once per window
    pub fn start_cleanup_loop(self: &Arc<Self>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let weak = Arc::downgrade(self);
        let window = self.window;
        self.cleanup.start(window, move || {
            let weak = weak.clone();
            async move {
                if let Some(state) = weak.upgrade() {
                    state.cleanup(window * 2);
                }
            }
        })
    }
}

impl Closable for RateLimitState {
    fn name(&self) -> &str {
        "rate limiter"
    }

    fn close(&self) -> Result<(), CloseError> {
        self.cleanup.stop();
        Ok(())
    }
}

/// Rate limit layer
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<RateLimitState>,
}

impl RateLimitLayer {
    pub fn new(state: Arc<RateLimitState>) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

/// Rate limit service
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<RateLimitState>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let ip = extract_client_ip(&req);

            match state.check(ip) {
                Ok(()) => inner.call(req).await,
                Err(retry_after) => {
                    warn!(
                        ip = %ip,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Rate limit exceeded"
                    );
                    Ok(rate_limit_response(retry_after))
                }
            }
        })
    }
}

/// Extract client IP from request
fn extract_client_ip<B>(req: &Request<B>) -> IpAddr {
    let header_ip = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
    };

    if let Some(ip) = header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip")) {
        return ip;
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn rate_limit_response(retry_after: Duration) -> Response {
    let mut response = ApiError::too_many_requests().into_response();
    let seconds = retry_after.as_millis().div_ceil(1000).max(1);
    if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
        response.headers_mut().insert("Retry-After", value);
    }
    response
}
