//! HTTP front end for the capture service
//!
//! One endpoint: `GET /capture?url=...&width=...&height=...&transparent=...`
//! returning PNG bytes on success and a JSON envelope on failure. Everything
//! else is a JSON 404. Parsing is deliberately permissive: absent or
//! unparseable parameters fall back to defaults rather than rejecting the
//! request.

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info};

use crate::bridge::CaptureBridge;
use crate::config::CaptureRequest;

/// Builds the capture router over a bridge to the capture worker.
pub fn router(bridge: CaptureBridge) -> Router {
    Router::new()
        .route("/capture", get(capture))
        .fallback(not_found)
        .with_state(bridge)
}

/// Binds `port` and serves the router until SIGINT or SIGTERM.
pub async fn serve(bridge: CaptureBridge, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Capture endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, router(bridge))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn capture(State(bridge): State<CaptureBridge>, RawQuery(query): RawQuery) -> Response {
    let request = parse_capture_query(query.as_deref().unwrap_or(""));
    debug!("Capture request for {:?}", request.url);

    match bridge.capture(request).await {
        Ok(image) => ([(header::CONTENT_TYPE, "image/png")], image).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "code": 500,
                "message": "Error capturing the website",
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "code": 404, "message": "Not found" })),
    )
        .into_response()
}

/// Translates a raw query string into a capture request.
///
/// Missing `url` becomes an empty target and fails later as a navigation
/// error; `width`/`height` fall back to the defaults when absent, not
/// numeric, or zero; `transparent` defaults to true unless present and not
/// `"true"`; `hide` may repeat, one selector per occurrence.
pub fn parse_capture_query(query: &str) -> CaptureRequest {
    let mut request = CaptureRequest::default();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "url" => request.url = value.into_owned(),
            "width" => {
                if let Some(width) = value.parse().ok().filter(|w| *w > 0) {
                    request.width = width;
                }
            }
            "height" => {
                if let Some(height) = value.parse().ok().filter(|h| *h > 0) {
                    request.height = height;
                }
            }
            "transparent" => request.transparent_background = value == "true",
            "hide" => request.hidden_elements.push(value.into_owned()),
            _ => {}
        }
    }

    request
}

async fn shutdown_signal() {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("Failed to create SIGINT handler");
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("Failed to create SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }
}
