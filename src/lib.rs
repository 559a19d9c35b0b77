//! # webcapture
//!
//! A rendering-capture service: hand it a URL and a viewport, get back a PNG
//! of the rendered page. One shared headless Chromium process hosts a bounded
//! pool of pages that concurrent captures lease; each capture navigates,
//! waits for the page's network traffic to go quiet, optionally strips
//! elements or forces a transparent background, and rasterizes the viewport.
//!
//! ## Architecture
//!
//! - The renderer process is launched lazily on the first capture and torn
//!   down after five idle minutes; the next capture starts a fresh one.
//! - At most `pool_capacity` pages (default 10) exist at once. Extra captures
//!   wait for a page to free up instead of opening more. Pages are recycled
//!   after `page_recycle_limit` leases (default 50).
//! - The HTTP gateway talks to the capture worker through correlated message
//!   envelopes: every order carries a fresh id, and every reply is routed
//!   back to exactly one waiting caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webcapture::{CaptureRequest, CaptureService, ChromiumRenderer, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = CaptureService::new(Arc::new(ChromiumRenderer), Config::default());
//!
//!     let image = service
//!         .capture(CaptureRequest::new("https://example.com").with_dimensions(800, 400))
//!         .await?;
//!     println!("Captured {} bytes", image.len());
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## HTTP Usage
//!
//! ```bash
//! webcapture --port 5000
//! curl 'http://localhost:5000/capture?url=https://example.com&width=800&height=400&transparent=false' > page.png
//! ```

/// Configuration and the capture request type
pub mod config;

/// Error taxonomy for capture failures
pub mod error;

/// Renderer engine traits and the chromiumoxide implementation
pub mod renderer;

/// Single-flight renderer process lifecycle
pub mod renderer_host;

/// Bounded pool of leasable pages
pub mod page_pool;

/// The capture pipeline and idle-shutdown timer
pub mod capture_service;

/// Correlated order/reply envelopes between gateway and worker
pub mod bridge;

/// Executor-side order loop
pub mod worker;

/// HTTP front end
pub mod gateway;

/// Performance metrics collection
pub mod metrics;

/// Command-line interface and logging setup
pub mod cli;

#[cfg(test)]
mod test_util;


pub use bridge::*;
pub use capture_service::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use gateway::*;
pub use metrics::*;
pub use page_pool::*;
pub use renderer::*;
pub use renderer_host::*;
pub use worker::*;
