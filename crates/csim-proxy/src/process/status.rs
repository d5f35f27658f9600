//! Proxy metrics.

use crate::middleware::StatusMetrics;
use serde_json::Value;
use std::sync::Arc;

pub struct StatusProcessor {
    metrics: Arc<StatusMetrics>,
}

impl StatusProcessor {
    pub fn new(metrics: Arc<StatusMetrics>) -> Self {
        Self { metrics }
    }

    pub fn get_metrics(&self) -> Value {
        self.metrics.to_json()
    }

    pub fn get_prometheus_metrics(&self) -> String {
        self.metrics.to_prometheus()
    }
}
