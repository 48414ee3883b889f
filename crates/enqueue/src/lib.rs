//! Tether enqueue: turn observed objects into work items for the reconcile queue.

#![forbid(unsafe_code)]

use tether_core::{Object, WorkItem};
use tether_predicate::propagated_from;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub mod handler;
pub mod queue;

pub use handler::{EnqueueRequestForClaim, EnqueueRequestForPropagator, EventHandler};
pub use queue::WorkQueue;

/// Accepts work items. Implementations must not block the caller.
pub trait Adder {
    fn add(&self, item: WorkItem);
}

impl<F> Adder for F
where
    F: Fn(WorkItem),
{
    fn add(&self, item: WorkItem) {
        self(item)
    }
}

impl Adder for mpsc::UnboundedSender<WorkItem> {
    fn add(&self, item: WorkItem) {
        if let Err(e) = self.send(item) {
            warn!(item = %e.0, "work item receiver closed; dropping");
        }
    }
}

/// Enqueue the managed resource bound to a claim-referencing object.
pub fn add_claim(obj: &dyn Object, queue: &dyn Adder) {
    let Some(r) = obj.as_claim_referencer().and_then(|c| c.claim_reference()) else {
        return;
    };
    let item = r.work_item();
    debug!(item = %item, from = obj.name(), "enqueue for claim");
    queue.add(item);
}

/// Enqueue the source a propagated object was copied from. Only the
/// namespace and name annotations are required; the UID annotation is not
/// consulted, unlike `is_propagated`.
pub fn add_propagator(obj: &dyn Object, queue: &dyn Adder) {
    let Some(item) = propagated_from(obj) else {
        return;
    };
    debug!(item = %item, from = obj.name(), "enqueue for propagator");
    queue.add(item);
}
