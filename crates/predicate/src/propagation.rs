//! Propagation classifiers.
//!
//! A source object that propagates into another namespace carries the three
//! `propagate-to-*` annotations; the copy carries the three
//! `propagate-from-*` annotations. Only key presence matters here, an empty
//! value still counts.

use tether_core::{
    Object, WorkItem, ANNOTATION_KEY_PROPAGATE_FROM_NAME, ANNOTATION_KEY_PROPAGATE_FROM_NAMESPACE,
    ANNOTATION_KEY_PROPAGATE_FROM_UID, ANNOTATION_KEY_PROPAGATE_TO_NAME,
    ANNOTATION_KEY_PROPAGATE_TO_NAMESPACE, ANNOTATION_KEY_PROPAGATE_TO_UID,
};

use crate::Predicate;

const PROPAGATE_TO: [&str; 3] = [
    ANNOTATION_KEY_PROPAGATE_TO_NAMESPACE,
    ANNOTATION_KEY_PROPAGATE_TO_NAME,
    ANNOTATION_KEY_PROPAGATE_TO_UID,
];

const PROPAGATE_FROM: [&str; 3] = [
    ANNOTATION_KEY_PROPAGATE_FROM_NAMESPACE,
    ANNOTATION_KEY_PROPAGATE_FROM_NAME,
    ANNOTATION_KEY_PROPAGATE_FROM_UID,
];

fn has_all(obj: &dyn Object, keys: &[&str]) -> bool {
    obj.annotations()
        .map_or(false, |a| keys.iter().all(|k| a.contains_key(*k)))
}

/// Object is the source of a propagation edge.
pub fn is_propagator() -> Predicate {
    Predicate::new(|obj| has_all(obj, &PROPAGATE_TO))
}

/// Object is the copy end of a propagation edge.
pub fn is_propagated() -> Predicate {
    Predicate::new(|obj| has_all(obj, &PROPAGATE_FROM))
}

/// Source a copy was propagated from. Reads namespace and name only.
pub fn propagated_from(obj: &dyn Object) -> Option<WorkItem> {
    let ns = obj.annotation(ANNOTATION_KEY_PROPAGATE_FROM_NAMESPACE)?;
    let name = obj.annotation(ANNOTATION_KEY_PROPAGATE_FROM_NAME)?;
    Some(WorkItem::new(ns, name))
}

/// Copy a source propagates to. Reads namespace and name only.
pub fn propagated_to(obj: &dyn Object) -> Option<WorkItem> {
    let ns = obj.annotation(ANNOTATION_KEY_PROPAGATE_TO_NAMESPACE)?;
    let name = obj.annotation(ANNOTATION_KEY_PROPAGATE_TO_NAME)?;
    Some(WorkItem::new(ns, name))
}
