//! Scriptable in-memory renderer for the tests.
//!
//! Page behavior is keyed by the target URL: a URL containing `invalid`
//! fails navigation, one containing `never-settles` reports one in-flight
//! request forever, anything else settles immediately. Shared counters let
//! tests observe launches, page churn and post-processing calls.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::error::CaptureError;
use crate::renderer::{Renderer, RendererPage, RendererProcess, RequestActivity};

/// Counters shared between a stub renderer and the test body.
#[derive(Default)]
pub struct StubWorld {
    pub launches: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub processes_closed: AtomicUsize,
    pub backgrounds_cleared: AtomicUsize,
    pub removed_selectors: Mutex<Vec<String>>,
    /// When set, closing the process reports an error (which the host is
    /// expected to swallow).
    pub fail_process_close: AtomicBool,
}

impl StubWorld {
    pub fn removed(&self) -> Vec<String> {
        self.removed_selectors.lock().unwrap().clone()
    }
}

pub struct StubRenderer {
    pub world: Arc<StubWorld>,
    /// Time a launch takes; widens the single-flight race window.
    pub launch_delay: Duration,
    /// Time a navigation takes; lets concurrent captures overlap.
    pub navigate_delay: Duration,
}

impl StubRenderer {
    pub fn new(world: Arc<StubWorld>) -> Self {
        Self {
            world,
            launch_delay: Duration::ZERO,
            navigate_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn launch(&self, _config: &Config) -> Result<Box<dyn RendererProcess>, CaptureError> {
        sleep(self.launch_delay).await;
        self.world.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubProcess {
            world: self.world.clone(),
            navigate_delay: self.navigate_delay,
        }))
    }
}

struct StubProcess {
    world: Arc<StubWorld>,
    navigate_delay: Duration,
}

#[async_trait]
impl RendererProcess for StubProcess {
    async fn open_page(&self) -> Result<Box<dyn RendererPage>, CaptureError> {
        self.world.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubPage {
            world: self.world.clone(),
            navigate_delay: self.navigate_delay,
            url: Mutex::new(String::new()),
            viewport: Mutex::new((0, 0)),
        }))
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.world.processes_closed.fetch_add(1, Ordering::SeqCst);
        if self.world.fail_process_close.load(Ordering::SeqCst) {
            return Err(CaptureError::PageError("stub close failure".to_string()));
        }
        Ok(())
    }
}

struct StubPage {
    world: Arc<StubWorld>,
    navigate_delay: Duration,
    url: Mutex<String>,
    viewport: Mutex<(u32, u32)>,
}

#[async_trait]
impl RendererPage for StubPage {
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        *self.viewport.lock().unwrap() = (width, height);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        sleep(self.navigate_delay).await;
        if url.contains("invalid") {
            return Err(CaptureError::Navigation(format!("cannot resolve {}", url)));
        }
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn watch_requests(&self) -> Result<Box<dyn RequestActivity>, CaptureError> {
        let in_flight = if self.url.lock().unwrap().contains("never-settles") {
            1
        } else {
            0
        };
        Ok(Box::new(StubActivity { in_flight }))
    }

    async fn clear_background(&self) -> Result<(), CaptureError> {
        self.world.backgrounds_cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_elements(&self, selectors: &[String]) -> Result<(), CaptureError> {
        self.world
            .removed_selectors
            .lock()
            .unwrap()
            .extend(selectors.iter().cloned());
        Ok(())
    }

    async fn screenshot(&self, omit_background: bool) -> Result<Vec<u8>, CaptureError> {
        let (width, height) = *self.viewport.lock().unwrap();
        Ok(format!("png {}x{} transparent={}", width, height, omit_background).into_bytes())
    }

    async fn close(&self) -> Result<(), CaptureError> {
        self.world.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubActivity {
    in_flight: i64,
}

impl RequestActivity for StubActivity {
    fn in_flight(&self) -> i64 {
        self.in_flight
    }
}
