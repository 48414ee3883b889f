//! Event filters built from object predicates.

use tether_core::{Event, Object};

use crate::Predicate;

/// Applies one object predicate to every kind of event. Updates are judged
/// by the new object.
#[derive(Debug, Clone)]
pub struct EventPredicates {
    predicate: Predicate,
}

impl EventPredicates {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }

    pub fn create(&self, obj: &dyn Object) -> bool {
        self.predicate.matches(obj)
    }

    pub fn update(&self, _old: &dyn Object, new: &dyn Object) -> bool {
        self.predicate.matches(new)
    }

    pub fn delete(&self, obj: &dyn Object) -> bool {
        self.predicate.matches(obj)
    }

    pub fn generic(&self, obj: &dyn Object) -> bool {
        self.predicate.matches(obj)
    }

    pub fn admits(&self, ev: &Event<'_>) -> bool {
        match *ev {
            Event::Create(o) => self.create(o),
            Event::Update { old, new } => self.update(old, new),
            Event::Delete(o) => self.delete(o),
            Event::Generic(o) => self.generic(o),
        }
    }
}

impl From<Predicate> for EventPredicates {
    fn from(predicate: Predicate) -> Self {
        Self::new(predicate)
    }
}
