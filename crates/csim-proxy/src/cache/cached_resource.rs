//! Singleton cache bound to its fetcher, with optional background refresh.
//!
//! Readers get the valid payload without waiting. When the payload has
//! expired and a refresh is already running they get the stale payload.
//! Only one fetch runs at a time.

use crate::cache::response_cache::{ResponseCache, SINGLETON_KEY};
use crate::domain::{CloseError, ProxyError, ProxyResult};
use crate::lifecycle::{BackgroundLoop, Closable};
use crate::ports::Clock;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Produces a fresh payload for a cached resource
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self) -> ProxyResult<T>;
}

pub struct CachedResource<T> {
    name: &'static str,
    cache: ResponseCache<T>,
    fetcher: Arc<dyn Fetcher<T>>,
    refresh_gate: Mutex<()>,
    background: BackgroundLoop,
}

impl<T> CachedResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, validity: Duration, fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self::with_cache(name, ResponseCache::new(validity), fetcher)
    }

    pub fn with_clock(
        name: &'static str,
        validity: Duration,
        fetcher: Arc<dyn Fetcher<T>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_cache(name, ResponseCache::with_clock(validity, clock), fetcher)
    }

    fn with_cache(name: &'static str, cache: ResponseCache<T>, fetcher: Arc<dyn Fetcher<T>>) -> Self {
        Self {
            name,
            cache,
            fetcher,
            refresh_gate: Mutex::new(()),
            background: BackgroundLoop::new(name),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn validity(&self) -> Duration {
        self.cache.validity()
    }

    /// Cached payload without any fetch, stale allowed
    pub fn peek(&self) -> ProxyResult<T> {
        self.cache
            .get_stale(SINGLETON_KEY)
            .ok_or(ProxyError::CacheNotPopulated(self.name))
    }

    /// Best available payload.
    ///
    /// A valid entry is returned directly. Otherwise the payload is fetched,
    /// falling back to the stale entry when the fetch fails or another fetch
    /// is in flight. Fails with `CacheNotPopulated` only when nothing was
    /// ever fetched successfully.
    pub async fn get(&self) -> ProxyResult<T> {
        if let Some(payload) = self.cache.get(SINGLETON_KEY) {
            return Ok(payload);
        }

        let stale = self.cache.get_stale(SINGLETON_KEY);
        let _gate = match (self.refresh_gate.try_lock(), &stale) {
            (Ok(gate), _) => gate,
            (Err(_), Some(payload)) => return Ok(payload.clone()),
            (Err(_), None) => self.refresh_gate.lock().await,
        };

        // Another caller may have filled the cache while we waited
        if let Some(payload) = self.cache.get(SINGLETON_KEY) {
            return Ok(payload);
        }

        match self.fetcher.fetch().await {
            Ok(payload) => {
                self.cache.set(SINGLETON_KEY, payload.clone());
                Ok(payload)
            }
            Err(e) => match self.cache.get_stale(SINGLETON_KEY) {
                Some(payload) => {
                    warn!(cache = self.name, error = %e, "Fetch failed, serving stale entry");
                    Ok(payload)
                }
                None => {
                    error!(cache = self.name, error = %e, "Fetch failed, cache empty");
                    Err(ProxyError::CacheNotPopulated(self.name))
                }
            },
        }
    }

    /// Invalidate and repopulate synchronously, surfacing the fetch error
    pub async fn force_update(&self) -> ProxyResult<T> {
        self.cache.invalidate(SINGLETON_KEY);
        let _gate = self.refresh_gate.lock().await;

        let payload = self.fetcher.fetch().await?;
        self.cache.set(SINGLETON_KEY, payload.clone());
        info!(cache = self.name, "Cache force updated");
        Ok(payload)
    }

    /// One background refresh. Failures are logged and the stale entry kept.
    pub async fn refresh_once(&self) {
        let _gate = self.refresh_gate.lock().await;
        match self.fetcher.fetch().await {
            Ok(payload) => {
                self.cache.set(SINGLETON_KEY, payload);
                debug!(cache = self.name, "Cache refreshed");
            }
            Err(e) => {
                warn!(cache = self.name, error = %e, "Background refresh failed, keeping previous entry");
            }
        }
    }

    /// Refresh every validity period until closed
    pub fn start_refresh_loop(self: &Arc<Self>) -> bool {
        let weak = Arc::downgrade(self);
        let started = self.background.start(self.validity(), move || {
            let weak = weak.clone();
            async move {
                if let Some(resource) = weak.upgrade() {
                    resource.refresh_once().await;
                }
            }
        });
        if started {
            info!(
                cache = self.name,
                period_secs = self.validity().as_secs(),
                "Cache refresh loop started"
            );
        }
        started
    }

    pub fn is_refreshing(&self) -> bool {
        self.background.is_running()
    }
}

impl<T> Closable for CachedResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn close(&self) -> Result<(), CloseError> {
        self.background.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Fetcher<usize> for CountingFetcher {
        async fn fetch(&self) -> ProxyResult<usize> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                Err(ProxyError::AllObserversFailed {
                    shard: 0,
                    attempts: 1,
                    last_error: "connection refused".into(),
                })
            } else {
                Ok(call)
            }
        }
    }

    fn resource(fetcher: &Arc<CountingFetcher>) -> Arc<CachedResource<usize>> {
        Arc::new(CachedResource::new(
            "test",
            Duration::from_secs(10),
            Arc::clone(fetcher) as Arc<dyn Fetcher<usize>>,
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_populated_before_first_success() {
        let fetcher = Arc::new(CountingFetcher::default());
        fetcher.set_failing(true);
        let cached = resource(&fetcher);

        assert!(matches!(
            cached.peek(),
            Err(ProxyError::CacheNotPopulated("test"))
        ));
        assert!(matches!(
            cached.get().await,
            Err(ProxyError::CacheNotPopulated("test"))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_validity_refetch_after() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = resource(&fetcher);

        assert_eq!(assert_ok!(cached.get().await), 1);
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(assert_ok!(cached.get().await), 1);
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(assert_ok!(cached.get().await), 2);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_served_stale_on_failure() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = resource(&fetcher);
        assert_eq!(assert_ok!(cached.get().await), 1);

        fetcher.set_failing(true);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(assert_ok!(cached.get().await), 1);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_update_surfaces_error() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = resource(&fetcher);
        assert_eq!(assert_ok!(cached.get().await), 1);

        assert_eq!(assert_ok!(cached.force_update().await), 2);

        fetcher.set_failing(true);
        assert!(matches!(
            cached.force_update().await,
            Err(ProxyError::AllObserversFailed { .. })
        ));
        // readers still get the last good payload
        assert_eq!(assert_ok!(cached.get().await), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_failure_never_surfaces() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cached = resource(&fetcher);
        assert!(cached.start_refresh_loop());
        assert!(!cached.start_refresh_loop());

        // first tick runs immediately
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(assert_ok!(cached.get().await), 1);

        fetcher.set_failing(true);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(assert_ok!(cached.peek()), 1);

        fetcher.set_failing(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(assert_ok!(cached.get().await), 3);

        cached.close().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fetcher.calls(), 3);
        assert!(!cached.is_refreshing());
    }
}
