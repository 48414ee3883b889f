//! Event handlers that enqueue work items for observed objects.

use tether_core::{Event, Object};

use crate::{add_claim, add_propagator, Adder};

/// Reacts to object-change events by adding work items to a queue.
pub trait EventHandler: Send + Sync {
    fn create(&self, obj: &dyn Object, queue: &dyn Adder);
    fn update(&self, old: &dyn Object, new: &dyn Object, queue: &dyn Adder);
    fn delete(&self, obj: &dyn Object, queue: &dyn Adder);
    fn generic(&self, obj: &dyn Object, queue: &dyn Adder);

    fn handle(&self, ev: &Event<'_>, queue: &dyn Adder) {
        match *ev {
            Event::Create(o) => self.create(o, queue),
            Event::Update { old, new } => self.update(old, new, queue),
            Event::Delete(o) => self.delete(o, queue),
            Event::Generic(o) => self.generic(o, queue),
        }
    }
}

/// Enqueues the claim a managed resource is bound to. Updates enqueue for
/// both the old and the new object, so rebinding reaches both claims.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueRequestForClaim;

impl EventHandler for EnqueueRequestForClaim {
    fn create(&self, obj: &dyn Object, queue: &dyn Adder) {
        add_claim(obj, queue);
    }

    fn update(&self, old: &dyn Object, new: &dyn Object, queue: &dyn Adder) {
        add_claim(old, queue);
        add_claim(new, queue);
    }

    fn delete(&self, obj: &dyn Object, queue: &dyn Adder) {
        add_claim(obj, queue);
    }

    fn generic(&self, obj: &dyn Object, queue: &dyn Adder) {
        add_claim(obj, queue);
    }
}

/// Enqueues the source object a propagated copy came from.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueRequestForPropagator;

impl EventHandler for EnqueueRequestForPropagator {
    fn create(&self, obj: &dyn Object, queue: &dyn Adder) {
        add_propagator(obj, queue);
    }

    fn update(&self, old: &dyn Object, new: &dyn Object, queue: &dyn Adder) {
        add_propagator(old, queue);
        add_propagator(new, queue);
    }

    fn delete(&self, obj: &dyn Object, queue: &dyn Adder) {
        add_propagator(obj, queue);
    }

    fn generic(&self, obj: &dyn Object, queue: &dyn Adder) {
        add_propagator(obj, queue);
    }
}
