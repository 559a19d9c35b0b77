//! Page pool management for the shared renderer process
//!
//! Maintains a bounded set of reusable pages. Captures lease a page, drive
//! it, and hand it back; pages are recycled after a fixed number of leases
//! so long-lived renderer state cannot accumulate.

use crate::renderer::RendererPage;
use crate::renderer_host::RendererHost;
use crate::{CaptureError, Config};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// An idle page waiting for its next lease.
struct IdleSlot {
    id: u64,
    page: Box<dyn RendererPage>,
    uses: u32,
}

/// Bookkeeping kept while a page is leased out.
struct LeaseMeta {
    uses: u32,
}

#[derive(Default)]
struct PoolState {
    idle: VecDeque<IdleSlot>,
    busy: HashMap<u64, LeaseMeta>,
}

/// A page leased from the pool
///
/// Hand it back with [`PagePool::release`] when the capture attempt is done,
/// whatever the outcome. The embedded permit is what holds the lease's share
/// of the pool capacity.
pub struct PageLease {
    /// The leased page. Valid until the renderer process is torn down.
    pub page: Box<dyn RendererPage>,
    slot_id: u64,
    _permit: OwnedSemaphorePermit,
}

impl PageLease {
    /// Pool-assigned identifier of the leased slot.
    pub fn slot_id(&self) -> u64 {
        self.slot_id
    }
}

/// Counts of pool slots by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub busy: usize,
    pub total: usize,
}

/// Bounded pool of pages inside the shared renderer process
///
/// At most `pool_capacity` pages exist at once. Acquisitions beyond that
/// wait until a release frees a permit; exactly one waiter proceeds per
/// release. Pages are created lazily, one per acquisition that finds the
/// idle queue empty.
pub struct PagePool {
    state: Mutex<PoolState>,
    capacity: Arc<Semaphore>,
    host: Arc<RendererHost>,
    next_id: AtomicU64,
    recycle_limit: u32,
}

impl PagePool {
    pub fn new(host: Arc<RendererHost>, config: &Config) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            capacity: Arc::new(Semaphore::new(config.pool_capacity)),
            host,
            next_id: AtomicU64::new(0),
            recycle_limit: config.page_recycle_limit,
        }
    }

    /// Leases a page, waiting for capacity if every slot is busy.
    ///
    /// Prefers an idle page; opens a new one only when none is idle. The
    /// renderer process is launched on first use.
    pub async fn acquire(&self) -> Result<PageLease, CaptureError> {
        let permit = self
            .capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CaptureError::PageError("page pool is closed".to_string()))?;

        let mut state = self.state.lock().await;

        if let Some(slot) = state.idle.pop_front() {
            state.busy.insert(slot.id, LeaseMeta { uses: slot.uses });
            debug!("Leased idle page slot {}", slot.id);
            return Ok(PageLease {
                page: slot.page,
                slot_id: slot.id,
                _permit: permit,
            });
        }

        // No idle page. Open a new one while still holding the state lock so
        // the emptiness check and the creation cannot interleave with
        // another acquisition.
        let page = self.host.open_page().await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        state.busy.insert(id, LeaseMeta { uses: 0 });
        debug!("Opened page slot {}", id);

        Ok(PageLease {
            page,
            slot_id: id,
            _permit: permit,
        })
    }

    /// Returns a leased page to the pool.
    ///
    /// The page goes back to the idle queue unless this lease brought it to
    /// the recycle limit, in which case it is closed and its slot forgotten.
    /// The next acquisition then opens a fresh page in its place.
    pub async fn release(&self, lease: PageLease) {
        let PageLease {
            page,
            slot_id,
            _permit: permit,
        } = lease;

        let to_close = {
            let mut state = self.state.lock().await;
            match state.busy.remove(&slot_id) {
                Some(meta) => {
                    let uses = meta.uses + 1;
                    if uses >= self.recycle_limit {
                        info!("Retiring page slot {} after {} uses", slot_id, uses);
                        Some(page)
                    } else {
                        debug!("Page slot {} back to idle ({} uses)", slot_id, uses);
                        state.idle.push_back(IdleSlot {
                            id: slot_id,
                            page,
                            uses,
                        });
                        None
                    }
                }
                None => {
                    // The pool was cleared while this lease was out.
                    warn!("Released page slot {} is no longer tracked", slot_id);
                    Some(page)
                }
            }
        };

        if let Some(page) = to_close {
            if let Err(e) = page.close().await {
                debug!("Error closing removed page slot {}: {}", slot_id, e);
            }
        }

        // Freed last so the woken waiter observes the updated queues.
        drop(permit);
    }

    /// Forgets every slot. Pages are not closed individually; callers invoke
    /// this when the owning renderer process is already gone.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let dropped = state.idle.len() + state.busy.len();
        state.idle.clear();
        state.busy.clear();

        if dropped > 0 {
            info!("Cleared {} page slots", dropped);
        }
    }

    pub async fn stats(&self) -> PoolStats {
        let state = self.state.lock().await;
        PoolStats {
            idle: state.idle.len(),
            busy: state.busy.len(),
            total: state.idle.len() + state.busy.len(),
        }
    }
}
