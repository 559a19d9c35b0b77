use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while capturing a page.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timeout waiting for network idle")]
    QuiescenceTimeout,

    #[error("Capture timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to launch renderer: {0}")]
    LaunchFailed(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("Screenshot failed: {0}")]
    CaptureFailed(String),

    #[error("{0}")]
    Worker(String),

    #[error("Capture worker is unavailable")]
    WorkerUnavailable,
}

impl From<chromiumoxide::error::CdpError> for CaptureError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        CaptureError::PageError(err.to_string())
    }
}
