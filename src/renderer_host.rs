use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CaptureError;
use crate::metrics::Metrics;
use crate::renderer::{Renderer, RendererPage, RendererProcess};

/// Owns the zero-or-one live renderer process.
///
/// Launch is lazy and single-flight: the liveness lock is held across the
/// launch itself, so concurrent callers queue behind it and find the stored
/// process instead of starting a second one. A failed launch leaves nothing
/// stored and the next caller retries.
pub struct RendererHost {
    renderer: Arc<dyn Renderer>,
    config: Config,
    live: Mutex<Option<Box<dyn RendererProcess>>>,
    metrics: Arc<Metrics>,
}

impl RendererHost {
    pub fn new(renderer: Arc<dyn Renderer>, config: Config, metrics: Arc<Metrics>) -> Self {
        Self {
            renderer,
            config,
            live: Mutex::new(None),
            metrics,
        }
    }

    /// Launches the renderer process if it is not already running.
    /// Idempotent and safe to call concurrently.
    pub async fn ensure_ready(&self) -> Result<(), CaptureError> {
        let mut live = self.live.lock().await;
        if live.is_none() {
            *live = Some(self.launch().await?);
        }
        Ok(())
    }

    /// Opens a page on the live process, launching it first if necessary.
    pub async fn open_page(&self) -> Result<Box<dyn RendererPage>, CaptureError> {
        let mut live = self.live.lock().await;
        let process = match &mut *live {
            Some(process) => process,
            none => none.insert(self.launch().await?),
        };
        process.open_page().await
    }

    /// Closes the live process, if any. Close failures are logged and the
    /// process is discarded regardless.
    pub async fn teardown(&self) {
        let process = self.live.lock().await.take();
        if let Some(mut process) = process {
            if let Err(e) = process.close().await {
                warn!("Error closing renderer process: {}", e);
            }
            info!("Renderer process closed");
        }
    }

    pub async fn is_live(&self) -> bool {
        self.live.lock().await.is_some()
    }

    async fn launch(&self) -> Result<Box<dyn RendererProcess>, CaptureError> {
        let process = self.renderer.launch(&self.config).await?;
        self.metrics.record_renderer_launch();
        info!("Renderer process launched");
        Ok(process)
    }
}
