//! Configuration structures and renderer launch settings
//!
//! Provides the service configuration (pool sizing, timeouts, listener port)
//! and the capture request type shared by the gateway, the bridge and the
//! capture pipeline.

use chromiumoxide::browser::BrowserConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Viewport width applied when a request does not specify one.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1200;

/// Viewport height applied when a request does not specify one.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 630;

/// Main configuration structure for the capture service
///
/// The defaults match the production deployment: a pool of ten pages inside
/// one shared renderer process, fifty captures per page before the page is
/// recycled, and a renderer that is torn down after five idle minutes.
///
/// # Examples
///
/// ```rust
/// use webcapture::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     pool_capacity: 4,
///     port: 8080,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Port the capture endpoint listens on (default: 5000)
    pub port: u16,

    /// Maximum number of pages held open at once (default: 10)
    ///
    /// Requests beyond this limit wait for a page to free up rather than
    /// opening more. Higher values increase concurrency but consume more
    /// renderer memory.
    pub pool_capacity: usize,

    /// Captures a page may serve before it is closed and replaced
    /// (default: 50)
    ///
    /// Long-lived pages accumulate renderer-side state; recycling them
    /// bounds that growth.
    pub page_recycle_limit: u32,

    /// Overall deadline for a single capture, pool wait included
    /// (default: 100 seconds)
    pub capture_timeout: Duration,

    /// Interval between checks of the in-flight request count while waiting
    /// for a page to go quiet (default: 100 milliseconds)
    pub quiescence_poll: Duration,

    /// Idle time after which the renderer process is shut down
    /// (default: 5 minutes)
    ///
    /// The next capture transparently starts a fresh process.
    pub idle_shutdown: Duration,

    /// Path to the Chrome/Chromium executable (default: auto-detect)
    ///
    /// If None, the launcher probes the usual installation locations.
    pub chrome_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            pool_capacity: 10,
            page_recycle_limit: 50,
            capture_timeout: Duration::from_secs(100),
            quiescence_poll: Duration::from_millis(100),
            idle_shutdown: Duration::from_secs(300),
            chrome_path: None,
        }
    }
}

impl Config {
    /// Chromium arguments for headless capture work.
    ///
    /// Sandboxing is disabled because the service runs inside containers
    /// where the kernel facilities the sandbox needs are unavailable.
    pub fn chrome_args(&self) -> Vec<String> {
        vec![
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            "--mute-audio".to_string(),
            "--no-first-run".to_string(),
        ]
    }

    /// Builds the launch configuration for the renderer process.
    pub fn browser_config(&self) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .window_size(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
            .args(self.chrome_args());

        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build()
    }

    /// Rejects configurations that cannot work at runtime.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_capacity == 0 {
            return Err("pool_capacity must be at least 1".to_string());
        }
        if self.page_recycle_limit == 0 {
            return Err("page_recycle_limit must be at least 1".to_string());
        }
        if self.capture_timeout.is_zero() {
            return Err("capture_timeout must be non-zero".to_string());
        }
        if self.quiescence_poll.is_zero() {
            return Err("quiescence_poll must be non-zero".to_string());
        }
        if self.idle_shutdown.is_zero() {
            return Err("idle_shutdown must be non-zero".to_string());
        }
        Ok(())
    }
}

/// A single capture order
///
/// Field names serialize camelCase to match the envelope carried between the
/// gateway and the capture worker.
///
/// # Examples
///
/// ```rust
/// use webcapture::CaptureRequest;
///
/// let request = CaptureRequest::new("https://example.com")
///     .with_dimensions(800, 400)
///     .with_transparent_background(false);
///
/// assert_eq!(request.width, 800);
/// assert!(!request.transparent_background);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRequest {
    /// Target page to render.
    pub url: String,

    /// Viewport width in CSS pixels.
    pub width: u32,

    /// Viewport height in CSS pixels.
    pub height: u32,

    /// Render with a transparent background and strip embed decorations.
    pub transparent_background: bool,

    /// CSS selectors whose matches are removed before rasterizing.
    pub hidden_elements: Vec<String>,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
            transparent_background: true,
            hidden_elements: Vec::new(),
        }
    }
}

impl CaptureRequest {
    /// Creates a request for `url` with the default viewport and flags.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the viewport dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the transparent-background flag.
    pub fn with_transparent_background(mut self, transparent: bool) -> Self {
        self.transparent_background = transparent;
        self
    }

    /// Sets the selectors to remove before rasterizing.
    pub fn with_hidden_elements(mut self, selectors: Vec<String>) -> Self {
        self.hidden_elements = selectors;
        self
    }
}
