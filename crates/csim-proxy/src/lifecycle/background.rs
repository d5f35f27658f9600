//! Background loop handle with a shutdown signal.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Owns at most one periodic task and the channel that stops it
pub struct BackgroundLoop {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundLoop {
    pub fn new(name: &'static str) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            name,
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Run `tick` immediately and then every `period` until stopped.
    ///
    /// Returns false when the loop is already running or was stopped.
    pub fn start<F, Fut>(&self, period: Duration, tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if *self.shutdown_tx.borrow() {
            warn!(task = self.name, "Background loop already stopped");
            return false;
        }
        if handle.as_ref().map_or(false, |h| !h.is_finished()) {
            warn!(task = self.name, "Background loop already running");
            return false;
        }

        let shutdown_rx = self.shutdown_tx.subscribe();
        *handle = Some(tokio::spawn(run_periodically(
            self.name,
            period,
            shutdown_rx,
            tick,
        )));
        true
    }

    /// Signal the loop to exit. Idempotent.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        self.handle.lock().take();
    }
}

impl Drop for BackgroundLoop {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

async fn run_periodically<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                debug!(task = name, "Shutdown signal received");
                return;
            }
            _ = interval.tick() => {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        debug!(task = name, "Shutdown signal received mid-tick");
                        return;
                    }
                    _ = tick() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let background = BackgroundLoop::new("test");

        let counter = Arc::clone(&ticks);
        assert!(background.start(Duration::from_secs(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));
        assert!(background.is_running());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        background.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!background.is_running());
    }

    #[tokio::test]
    async fn test_cannot_restart_after_stop() {
        let background = BackgroundLoop::new("test");
        background.stop();
        assert!(!background.start(Duration::from_secs(1), || async {}));
    }
}
