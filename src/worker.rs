//! Executor side of the capture boundary
//!
//! Receives order envelopes, runs them against the capture service, and
//! answers every order id with exactly one reply envelope. A panicking
//! capture becomes a failure reply rather than a lost caller.

use crate::bridge::{WireReply, WireRequest, WorkOrder};
use crate::CaptureService;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Spawns the order loop. Each order is processed on its own task so
/// captures interleave up to the page pool's capacity.
pub fn spawn_capture_worker(
    service: Arc<CaptureService>,
    mut orders: mpsc::UnboundedReceiver<WireRequest>,
    replies: mpsc::UnboundedSender<WireReply>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(order) = orders.recv().await {
            let service = service.clone();
            let replies = replies.clone();

            tokio::spawn(async move {
                let reply = execute_order(service, order).await;
                if replies.send(reply).is_err() {
                    warn!("Reply channel closed; dropping a capture result");
                }
            });
        }

        debug!("Order channel closed; capture worker exiting");
    })
}

async fn execute_order(service: Arc<CaptureService>, envelope: WireRequest) -> WireReply {
    let WireRequest { id, order } = envelope;

    match order {
        WorkOrder::CaptureWebsite(request) => {
            let outcome = AssertUnwindSafe(service.capture(request))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(image)) => WireReply::ok(id, image),
                Ok(Err(e)) => WireReply::failure(id, e.to_string()),
                Err(_) => {
                    error!("Capture task panicked for order {}", id);
                    WireReply::failure(id, "capture task panicked".to_string())
                }
            }
        }
    }
}
