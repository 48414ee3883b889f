//! In-memory work queue: FIFO, coalesced by work item, bounded.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use metrics::counter;
use rustc_hash::FxHashSet;
use tether_core::WorkItem;
use tracing::trace;

use crate::Adder;

const DEFAULT_CAP: usize = 1024;

struct Inner {
    pending: FxHashSet<WorkItem>,
    order: VecDeque<WorkItem>,
    dropped: u64,
}

/// Coalescing queue keyed by work item with FIFO order and fixed capacity.
/// Adding an item already pending is a no-op; adding past capacity evicts
/// the oldest pending item.
pub struct WorkQueue {
    inner: Mutex<Inner>,
    cap: usize,
}

impl WorkQueue {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { pending: FxHashSet::default(), order: VecDeque::new(), dropped: 0 }),
            cap: cap.max(1),
        }
    }

    /// Capacity from `TETHER_QUEUE_CAP`, default 1024.
    pub fn from_env() -> Self {
        let cap = std::env::var("TETHER_QUEUE_CAP").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_CAP);
        Self::with_capacity(cap)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize { self.cap }
    pub fn len(&self) -> usize { self.lock().order.len() }
    pub fn is_empty(&self) -> bool { self.lock().order.is_empty() }
    pub fn dropped(&self) -> u64 { self.lock().dropped }

    pub fn push(&self, item: WorkItem) {
        let mut inner = self.lock();
        if inner.pending.contains(&item) {
            trace!(item = %item, "work item already pending");
            return;
        }
        if inner.order.len() >= self.cap {
            if let Some(old) = inner.order.pop_front() {
                inner.pending.remove(&old);
                inner.dropped += 1;
                counter!("tether_work_items_dropped", 1);
            }
        }
        inner.pending.insert(item.clone());
        inner.order.push_back(item);
        counter!("tether_work_items_added", 1);
    }

    pub fn pop(&self) -> Option<WorkItem> {
        let mut inner = self.lock();
        let item = inner.order.pop_front()?;
        inner.pending.remove(&item);
        Some(item)
    }

    /// Drain all currently pending items in FIFO order.
    pub fn drain_ready(&self) -> Vec<WorkItem> {
        let mut inner = self.lock();
        inner.pending.clear();
        inner.order.drain(..).collect()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAP)
    }
}

impl Adder for WorkQueue {
    fn add(&self, item: WorkItem) {
        self.push(item);
    }
}
