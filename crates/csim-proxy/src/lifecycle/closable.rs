//! Closable-components handler.
//!
//! Fan-out of `close()` to everything that owns a background loop or an open
//! resource. The handler only keeps weak references; ownership stays with
//! the proxy.

use crate::domain::CloseError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// A component with a stop capability
pub trait Closable: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Stop background work and release resources
    fn close(&self) -> Result<(), CloseError>;
}

/// Tracks closable components in registration order
#[derive(Default)]
pub struct ClosableComponentsHandler {
    components: Mutex<Vec<Weak<dyn Closable>>>,
    closed: AtomicBool,
}

impl ClosableComponentsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component
    pub fn add<T: Closable + 'static>(&self, component: &Arc<T>) {
        let weak: Weak<T> = Arc::downgrade(component);
        self.components.lock().push(weak);
    }

    /// Register a component already erased to `dyn Closable`
    pub fn add_dyn(&self, component: &Arc<dyn Closable>) {
        self.components.lock().push(Arc::downgrade(component));
    }

    pub fn len(&self) -> usize {
        self.components.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close every registered component once, in registration order.
    ///
    /// A failing component does not stop the sequence. Returns the number
    /// of failures; later calls are no-ops returning 0.
    pub fn close(&self) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Closable components already closed");
            return 0;
        }

        let components: Vec<_> = std::mem::take(&mut *self.components.lock());
        let mut failures = 0;

        for weak in components {
            let Some(component) = weak.upgrade() else {
                debug!("Skipping dropped component");
                continue;
            };

            match component.close() {
                Ok(()) => debug!(component = component.name(), "Component closed"),
                Err(e) => {
                    failures += 1;
                    error!(component = component.name(), error = %e, "Failed to close component");
                }
            }
        }

        info!(failures, "Closable components closed");
        failures
    }
}
