//! Capture pipeline orchestration
//!
//! Runs one capture end to end: lease a page, size the viewport, navigate,
//! wait for the network to go quiet, post-process, rasterize, release. Also
//! owns the renderer's idle-shutdown timer.

use crate::page_pool::{PageLease, PagePool, PoolStats};
use crate::renderer::{Renderer, RequestActivity};
use crate::renderer_host::RendererHost;
use crate::{CaptureError, CaptureRequest, Config, Metrics};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Embed decoration selectors stripped from transparent captures.
const EMBED_CHROME_SELECTORS: [&str; 2] = [".EmbedFrame-footer", ".EmbedFrame-header"];

/// Captures pages through the pooled renderer
///
/// One instance serves the whole process. Each capture is a single attempt;
/// failures are reported, never retried.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use webcapture::{CaptureRequest, CaptureService, ChromiumRenderer, Config};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = CaptureService::new(Arc::new(ChromiumRenderer), Config::default());
///
///     let image = service
///         .capture(CaptureRequest::new("https://example.com"))
///         .await?;
///     println!("captured {} bytes", image.len());
///
///     service.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct CaptureService {
    host: Arc<RendererHost>,
    pool: Arc<PagePool>,
    config: Config,
    metrics: Arc<Metrics>,
    idle_timer: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl CaptureService {
    pub fn new(renderer: Arc<dyn Renderer>, config: Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let host = Arc::new(RendererHost::new(renderer, config.clone(), metrics.clone()));
        let pool = Arc::new(PagePool::new(host.clone(), &config));

        Self {
            host,
            pool,
            config,
            metrics,
            idle_timer: Mutex::new(None),
        }
    }

    /// Captures `request` and returns the PNG bytes.
    pub async fn capture(&self, request: CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        let started = Instant::now();
        debug!(
            "Capturing {} at {}x{}",
            request.url, request.width, request.height
        );

        let result = self.run(&request).await;
        let duration = started.elapsed();

        self.metrics.record_capture(duration, result.is_ok());
        self.metrics.record_pool(&self.pool.stats().await);
        self.reset_idle_timer().await;

        match &result {
            Ok(image) => info!(
                "Captured {} in {:?} ({} bytes)",
                request.url,
                duration,
                image.len()
            ),
            Err(e) => warn!("Capture of {} failed after {:?}: {}", request.url, duration, e),
        }

        result
    }

    async fn run(&self, request: &CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        let deadline = Instant::now() + self.config.capture_timeout;

        let lease = match timeout_at(deadline, self.pool.acquire()).await {
            Ok(acquired) => acquired?,
            Err(_) => return Err(CaptureError::Timeout(self.config.capture_timeout)),
        };

        let result = self.drive(&lease, request, deadline).await;

        // The lease goes back whatever happened above.
        self.pool.release(lease).await;

        result
    }

    async fn drive(
        &self,
        lease: &PageLease,
        request: &CaptureRequest,
        deadline: Instant,
    ) -> Result<Vec<u8>, CaptureError> {
        lease.page.set_viewport(request.width, request.height).await?;

        match timeout_at(deadline, lease.page.navigate(&request.url)).await {
            Ok(navigated) => navigated?,
            Err(_) => return Err(CaptureError::Timeout(self.config.capture_timeout)),
        }

        let activity = lease.page.watch_requests().await?;
        self.await_quiescence(activity.as_ref()).await?;

        if request.transparent_background {
            lease.page.clear_background().await?;
            let embed_chrome: Vec<String> = EMBED_CHROME_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect();
            lease.page.remove_elements(&embed_chrome).await?;
        }

        if !request.hidden_elements.is_empty() {
            lease.page.remove_elements(&request.hidden_elements).await?;
        }

        lease.page.screenshot(request.transparent_background).await
    }

    /// Polls the in-flight request count until it reads zero.
    ///
    /// The iteration budget mirrors the overall capture timeout; pages with
    /// persistent background polling never settle and time out here.
    async fn await_quiescence(&self, activity: &dyn RequestActivity) -> Result<(), CaptureError> {
        let poll = self.config.quiescence_poll;
        let budget = (self.config.capture_timeout.as_millis() / poll.as_millis().max(1)).max(1);
        let mut polls: u128 = 0;

        loop {
            sleep(poll).await;

            if activity.in_flight() == 0 {
                return Ok(());
            }

            polls += 1;
            if polls > budget {
                return Err(CaptureError::QuiescenceTimeout);
            }
        }
    }

    /// Pushes the renderer's idle deadline forward by the configured window.
    async fn reset_idle_timer(&self) {
        let host = self.host.clone();
        let pool = self.pool.clone();
        let metrics = self.metrics.clone();
        let idle_after = self.config.idle_shutdown;

        let mut timer = self.idle_timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        *timer = Some(tokio::spawn(async move {
            sleep(idle_after).await;
            info!("Renderer idle for {:?}, shutting it down", idle_after);
            host.teardown().await;
            pool.clear().await;
            metrics.record_pool(&pool.stats().await);
        }));
    }

    /// Current pool occupancy.
    pub async fn pool_stats(&self) -> PoolStats {
        self.pool.stats().await
    }

    /// Whether the renderer process is currently live.
    pub async fn renderer_live(&self) -> bool {
        self.host.is_live().await
    }

    pub async fn shutdown(&self) {
        info!("Shutting down capture service...");

        if let Some(timer) = self.idle_timer.lock().await.take() {
            timer.abort();
        }

        self.host.teardown().await;
        self.pool.clear().await;

        info!("Capture service shutdown complete");
    }
}
