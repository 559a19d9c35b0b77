//! Renderer engine boundary
//!
//! Traits for the headless browser the capture pipeline drives, plus the
//! production chromiumoxide implementation. The pool and pipeline only ever
//! see these traits, which keeps them exercisable without a Chromium binary.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::CaptureError;

/// Launches renderer processes.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn launch(&self, config: &Config) -> Result<Box<dyn RendererProcess>, CaptureError>;
}

/// One live renderer process. Pages opened from it die with it.
#[async_trait]
pub trait RendererProcess: Send + Sync {
    /// Opens a fresh blank page.
    async fn open_page(&self) -> Result<Box<dyn RendererPage>, CaptureError>;

    /// Closes the process. Pages become invalid immediately.
    async fn close(&mut self) -> Result<(), CaptureError>;
}

/// One browsing context inside the renderer process.
#[async_trait]
pub trait RendererPage: Send + Sync {
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CaptureError>;

    /// Navigates and waits for the engine's own load signal.
    async fn navigate(&self, url: &str) -> Result<(), CaptureError>;

    /// Starts counting request lifecycle events on this page. Only events
    /// observed after the call are counted; dropping the returned watcher
    /// unsubscribes.
    async fn watch_requests(&self) -> Result<Box<dyn RequestActivity>, CaptureError>;

    /// Forces the document body's background transparent.
    async fn clear_background(&self) -> Result<(), CaptureError>;

    /// Removes every element matching any of `selectors`.
    async fn remove_elements(&self, selectors: &[String]) -> Result<(), CaptureError>;

    /// Rasterizes the current viewport as PNG.
    async fn screenshot(&self, omit_background: bool) -> Result<Vec<u8>, CaptureError>;

    async fn close(&self) -> Result<(), CaptureError>;
}

/// Live view of a page's in-flight request count.
pub trait RequestActivity: Send + Sync {
    fn in_flight(&self) -> i64;
}

/// Production renderer backed by a headless Chromium process.
pub struct ChromiumRenderer;

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn launch(&self, config: &Config) -> Result<Box<dyn RendererProcess>, CaptureError> {
        let browser_config = config
            .browser_config()
            .map_err(CaptureError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

        // The handler implements Stream and must be polled for the life of
        // the process to service CDP traffic.
        let handler_task = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Renderer handler error: {}", e);
                        return Err(e);
                    }
                    None => {
                        // Stream ends when the process goes away
                        info!("Renderer handler stream ended");
                        break;
                    }
                }
            }
            Ok(())
        });

        Ok(Box::new(ChromiumProcess {
            browser,
            handler_task,
        }))
    }
}

struct ChromiumProcess {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<Result<(), chromiumoxide::error::CdpError>>,
}

#[async_trait]
impl RendererProcess for ChromiumProcess {
    async fn open_page(&self) -> Result<Box<dyn RendererPage>, CaptureError> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        let result = self.browser.close().await;
        self.handler_task.abort();
        result?;
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl RendererPage for ChromiumPage {
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| CaptureError::PageError(format!("invalid viewport params: {}", e)))?;

        self.page.execute(params).await?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn watch_requests(&self) -> Result<Box<dyn RequestActivity>, CaptureError> {
        // Network events only flow once the domain is enabled.
        self.page.execute(EnableParams::default()).await?;

        let started = self
            .page
            .event_listener::<EventRequestWillBeSent>()
            .await?;
        let finished = self.page.event_listener::<EventLoadingFinished>().await?;
        let failed = self.page.event_listener::<EventLoadingFailed>().await?;

        let in_flight = Arc::new(AtomicI64::new(0));
        let pumps = vec![
            pump_increments(started, in_flight.clone()),
            pump_decrements(finished, in_flight.clone()),
            pump_decrements(failed, in_flight.clone()),
        ];

        Ok(Box::new(ChromiumRequestActivity { in_flight, pumps }))
    }

    async fn clear_background(&self) -> Result<(), CaptureError> {
        self.page
            .evaluate(
                "document.body.style.setProperty('background-color', 'transparent', 'important')",
            )
            .await?;
        Ok(())
    }

    async fn remove_elements(&self, selectors: &[String]) -> Result<(), CaptureError> {
        for selector in selectors {
            let quoted = serde_json::to_string(selector)
                .map_err(|e| CaptureError::PageError(e.to_string()))?;
            let js = format!(
                "document.querySelectorAll({}).forEach((el) => el.remove())",
                quoted
            );
            self.page.evaluate(js).await?;
        }
        Ok(())
    }

    async fn screenshot(&self, omit_background: bool) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .omit_background(omit_background)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn close(&self) -> Result<(), CaptureError> {
        // Page::close consumes; Page is a cheap handle clone.
        self.page.clone().close().await?;
        Ok(())
    }
}

struct ChromiumRequestActivity {
    in_flight: Arc<AtomicI64>,
    pumps: Vec<tokio::task::JoinHandle<()>>,
}

impl RequestActivity for ChromiumRequestActivity {
    fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for ChromiumRequestActivity {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

fn pump_increments<S>(mut events: S, count: Arc<AtomicI64>) -> tokio::task::JoinHandle<()>
where
    S: Stream + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while events.next().await.is_some() {
            count.fetch_add(1, Ordering::SeqCst);
        }
    })
}

fn pump_decrements<S>(mut events: S, count: Arc<AtomicI64>) -> tokio::task::JoinHandle<()>
where
    S: Stream + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while events.next().await.is_some() {
            // Completions of requests started before we subscribed must not
            // push the count negative.
            let _ = count.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some((n - 1).max(0)));
        }
    })
}
