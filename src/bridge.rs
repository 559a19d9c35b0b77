//! Request correlation across the execution boundary
//!
//! The gateway and the capture worker communicate through typed envelopes:
//! an order carrying a fresh correlation id goes out, exactly one reply
//! carrying the same id comes back. The bridge keeps the pending-caller map
//! and routes each reply to its originating caller exactly once.

use crate::worker::spawn_capture_worker;
use crate::{CaptureError, CaptureRequest, CaptureService};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

/// Work crossing the boundary toward the capture worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum WorkOrder {
    CaptureWebsite(CaptureRequest),
}

/// Order envelope: a correlation id plus the order itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRequest {
    pub id: Uuid,
    #[serde(flatten)]
    pub order: WorkOrder,
}

/// Reply envelope, matched back to its caller by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReply {
    pub id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireReply {
    pub fn ok(id: Uuid, data: Vec<u8>) -> Self {
        Self {
            id,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(id: Uuid, error: String) -> Self {
        Self {
            id,
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

type PendingMap = Arc<DashMap<Uuid, oneshot::Sender<Result<Vec<u8>, CaptureError>>>>;

/// Caller-side handle to the capture worker
///
/// Cheap to clone; every clone shares the order channel and the pending map.
#[derive(Clone)]
pub struct CaptureBridge {
    orders: mpsc::UnboundedSender<WireRequest>,
    pending: PendingMap,
}

impl CaptureBridge {
    /// Spawns a capture worker over `service` and wires a bridge to it.
    pub fn start(service: Arc<CaptureService>) -> Self {
        let (orders_tx, orders_rx) = mpsc::unbounded_channel();
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();

        spawn_capture_worker(service, orders_rx, replies_tx);

        Self::with_channels(orders_tx, replies_rx)
    }

    /// Builds a bridge over explicit channel halves. The reply pump runs
    /// until the reply stream ends, then fails every caller still waiting.
    pub fn with_channels(
        orders: mpsc::UnboundedSender<WireRequest>,
        mut replies: mpsc::UnboundedReceiver<WireReply>,
    ) -> Self {
        let pending: PendingMap = Arc::new(DashMap::new());

        let pump_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(reply) = replies.recv().await {
                // remove() hands the entry to exactly one reply; a late or
                // duplicate id finds nothing and is dropped here.
                match pump_pending.remove(&reply.id) {
                    Some((_, caller)) => {
                        let result = if reply.success {
                            Ok(reply.data.unwrap_or_default())
                        } else {
                            Err(CaptureError::Worker(
                                reply
                                    .error
                                    .unwrap_or_else(|| "unknown worker error".to_string()),
                            ))
                        };
                        let _ = caller.send(result);
                    }
                    None => {
                        debug!("Discarding reply for unknown id {}", reply.id);
                    }
                }
            }

            let orphaned: Vec<Uuid> = pump_pending.iter().map(|entry| *entry.key()).collect();
            if !orphaned.is_empty() {
                warn!(
                    "Reply channel closed with {} captures still pending",
                    orphaned.len()
                );
            }
            for id in orphaned {
                if let Some((_, caller)) = pump_pending.remove(&id) {
                    let _ = caller.send(Err(CaptureError::WorkerUnavailable));
                }
            }
        });

        Self { orders, pending }
    }

    /// Submits a capture and waits for its reply.
    pub async fn capture(&self, request: CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        let id = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(id, reply_tx);

        let envelope = WireRequest {
            id,
            order: WorkOrder::CaptureWebsite(request),
        };

        if self.orders.send(envelope).is_err() {
            self.pending.remove(&id);
            return Err(CaptureError::WorkerUnavailable);
        }

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(CaptureError::WorkerUnavailable),
        }
    }

    /// Number of captures awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
