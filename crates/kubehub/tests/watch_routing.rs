#![forbid(unsafe_code)]

use std::sync::Arc;

use kube::core::DynamicObject;
use kube::runtime::watcher::Event as WatchEvent;
use serde_json::json;
use tether_core::{
    Gvk, ManagedKind, WorkItem, ANNOTATION_KEY_PROPAGATE_FROM_NAME,
    ANNOTATION_KEY_PROPAGATE_FROM_NAMESPACE,
};
use tether_enqueue::{EnqueueRequestForClaim, EnqueueRequestForPropagator, WorkQueue};
use tether_kubehub::{Role, Router, WatchTracker};
use tether_predicate::{all_of, is_managed_kind, DeclaredTypeResolver, EventPredicates, Predicate};

fn managed(uid: &str, name: &str, claim: Option<(&str, &str)>) -> DynamicObject {
    let mut spec = json!({});
    if let Some((ns, n)) = claim {
        spec["claimRef"] = json!({
            "namespace": ns,
            "name": n,
            "apiVersion": "example.org/v1alpha1",
            "kind": "MockClaim",
        });
    }
    managed_with_spec(uid, name, spec)
}

fn managed_with_spec(uid: &str, name: &str, spec: serde_json::Value) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "example.org/v1alpha1",
        "kind": "MockManaged",
        "metadata": { "name": name, "uid": uid },
        "spec": spec,
    }))
    .unwrap()
}

fn secret(uid: &str, name: &str, from: Option<(&str, &str)>) -> DynamicObject {
    let mut meta = json!({ "name": name, "namespace": "copies", "uid": uid });
    if let Some((ns, n)) = from {
        meta["annotations"] = json!({
            ANNOTATION_KEY_PROPAGATE_FROM_NAMESPACE: ns,
            ANNOTATION_KEY_PROPAGATE_FROM_NAME: n,
        });
    }
    serde_json::from_value(json!({ "apiVersion": "v1", "kind": "Secret", "metadata": meta }))
        .unwrap()
}

fn claim_router() -> Router {
    let managed_kind = ManagedKind(Gvk::new("example.org", "v1alpha1", "MockManaged"));
    Router::new(
        EventPredicates::new(is_managed_kind(managed_kind, DeclaredTypeResolver)),
        Arc::new(EnqueueRequestForClaim),
    )
}

#[test]
fn applied_then_rebound_enqueues_both_claims() {
    let router = claim_router();
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Managed);

    let bound = managed("1", "mr", Some(("a", "one")));
    assert_eq!(tracker.observe(WatchEvent::Applied(bound), &router, &queue), 1);
    assert_eq!(queue.drain_ready(), vec![WorkItem::new("a", "one")]);

    // Update: old and new bindings are both reconciled.
    tracker.observe(WatchEvent::Applied(managed("1", "mr", Some(("b", "two")))), &router, &queue);
    assert_eq!(queue.drain_ready(), vec![WorkItem::new("a", "one"), WorkItem::new("b", "two")]);

    tracker.observe(WatchEvent::Deleted(managed("1", "mr", Some(("b", "two")))), &router, &queue);
    assert_eq!(queue.drain_ready(), vec![WorkItem::new("b", "two")]);
    assert!(tracker.is_empty());
}

#[test]
fn unbound_and_foreign_kinds_enqueue_nothing() {
    let router = claim_router();
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Managed);

    tracker.observe(WatchEvent::Applied(managed("1", "unbound", None)), &router, &queue);
    // A secret is not the managed kind, so the filter drops it.
    let admitted = tracker.observe(WatchEvent::Applied(secret("2", "s", None)), &router, &queue);
    assert_eq!(admitted, 0);
    assert!(queue.is_empty());
    assert_eq!(tracker.len(), 2);
}

#[test]
fn restart_routes_deletes_for_vanished_objects() {
    let router = claim_router();
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Managed);

    let keep = managed("1", "keep", Some(("ns", "keep-claim")));
    let gone = managed("2", "gone", Some(("ns", "gone-claim")));
    tracker.observe(WatchEvent::Applied(keep), &router, &queue);
    tracker.observe(WatchEvent::Applied(gone), &router, &queue);
    queue.drain_ready();

    let admitted = tracker.observe(
        WatchEvent::Restarted(vec![managed("1", "keep", Some(("ns", "keep-claim")))]),
        &router,
        &queue,
    );
    assert_eq!(admitted, 2);
    let mut got = queue.drain_ready();
    got.sort();
    assert_eq!(got, vec![WorkItem::new("ns", "gone-claim"), WorkItem::new("ns", "keep-claim")]);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn propagated_copies_enqueue_their_source() {
    let router = Router::new(
        EventPredicates::new(all_of(Vec::<Predicate>::new())),
        Arc::new(EnqueueRequestForPropagator),
    );
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Plain);

    tracker.observe(WatchEvent::Applied(secret("1", "plain", None)), &router, &queue);
    let copy = secret("2", "copy", Some(("coolns", "coolname")));
    tracker.observe(WatchEvent::Applied(copy), &router, &queue);
    assert_eq!(queue.drain_ready(), vec![WorkItem::new("coolns", "coolname")]);
}

fn broken(uid: &str, name: &str) -> DynamicObject {
    managed_with_spec(uid, name, json!({ "claimRef": "garbage" }))
}

#[test]
fn malformed_update_keeps_last_good_binding_until_delete() {
    let router = claim_router();
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Managed);

    tracker.observe(WatchEvent::Applied(managed("1", "mr", Some(("a", "one")))), &router, &queue);
    queue.drain_ready();

    assert_eq!(tracker.observe(WatchEvent::Applied(broken("1", "mr")), &router, &queue), 0);
    assert!(queue.is_empty());
    assert_eq!(tracker.len(), 1);

    // The final state does not parse, so the delete carries the last good binding.
    assert_eq!(tracker.observe(WatchEvent::Deleted(broken("1", "mr")), &router, &queue), 1);
    assert_eq!(queue.drain_ready(), vec![WorkItem::new("a", "one")]);
    assert!(tracker.is_empty());
}

#[test]
fn restart_keeps_listed_objects_that_fail_to_parse() {
    let router = claim_router();
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Managed);

    tracker.observe(WatchEvent::Applied(managed("1", "mr", Some(("a", "one")))), &router, &queue);
    queue.drain_ready();

    let admitted = tracker.observe(WatchEvent::Restarted(vec![broken("1", "mr")]), &router, &queue);
    assert_eq!(admitted, 0);
    assert!(queue.is_empty());
    assert_eq!(tracker.len(), 1);

    // Recovers into an ordinary update from the last good snapshot.
    tracker.observe(WatchEvent::Applied(managed("1", "mr", Some(("b", "two")))), &router, &queue);
    assert_eq!(queue.drain_ready(), vec![WorkItem::new("a", "one"), WorkItem::new("b", "two")]);
}

#[test]
fn untracked_malformed_delete_routes_nothing() {
    let router = claim_router();
    let queue = WorkQueue::with_capacity(16);
    let mut tracker = WatchTracker::new(Role::Managed);

    assert_eq!(tracker.observe(WatchEvent::Deleted(broken("9", "never-seen")), &router, &queue), 0);
    assert!(queue.is_empty());
    assert!(tracker.is_empty());
}
