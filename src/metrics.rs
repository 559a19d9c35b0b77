use metrics::{register_counter, register_gauge, register_histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use crate::page_pool::PoolStats;

/// Handles for every metric the service emits.
///
/// Construct after the recorder is installed; handles registered against the
/// default recorder are no-ops.
pub struct Metrics {
    pub captures_total: Counter,
    pub capture_failures_total: Counter,
    pub capture_duration: Histogram,
    pub pool_pages_idle: Gauge,
    pub pool_pages_busy: Gauge,
    pub renderer_launches_total: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            captures_total: register_counter!("webcapture_captures_total"),
            capture_failures_total: register_counter!("webcapture_capture_failures_total"),
            capture_duration: register_histogram!("webcapture_capture_duration_seconds"),
            pool_pages_idle: register_gauge!("webcapture_pool_pages_idle"),
            pool_pages_busy: register_gauge!("webcapture_pool_pages_busy"),
            renderer_launches_total: register_counter!("webcapture_renderer_launches_total"),
        }
    }

    pub fn record_capture(&self, duration: Duration, success: bool) {
        if success {
            self.captures_total.increment(1);
        } else {
            self.capture_failures_total.increment(1);
        }

        self.capture_duration.record(duration.as_secs_f64());
    }

    pub fn record_pool(&self, stats: &PoolStats) {
        self.pool_pages_idle.set(stats.idle as f64);
        self.pool_pages_busy.set(stats.busy as f64);
    }

    pub fn record_renderer_launch(&self) {
        self.renderer_launches_total.increment(1);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the Prometheus recorder and serves scrapes on `addr`.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Prometheus metrics listener on {}", addr);
    Ok(())
}
