#![forbid(unsafe_code)]

use tether_core::{ClassKind, Gvk, LabelSelector, ManagedKind, ObjectRef, Resource};
use tether_predicate::{
    all_of, any_of, has_class_reference_kind, has_class_selector, has_managed_resource_reference_kind,
    has_no_class_reference, has_no_class_selector, has_no_managed_resource_reference, is_propagated,
    is_propagator, Predicate,
};

fn class_gvk() -> Gvk {
    Gvk::new("example.org", "v1alpha1", "MockClass")
}

fn managed_gvk() -> Gvk {
    Gvk::new("example.org", "v1alpha1", "MockManaged")
}

fn reference(g: &Gvk) -> ObjectRef {
    ObjectRef { api_version: g.api_version(), kind: g.kind.clone(), name: "x".into(), ..Default::default() }
}

// Claims waiting for a class to be picked by selector: they carry a selector
// but have neither a class nor a managed resource yet.
fn needs_class_selection() -> Predicate {
    all_of([has_class_selector(), has_no_class_reference(), has_no_managed_resource_reference()])
}

// Claims ready to be bound to a managed resource of our kind.
fn ready_to_bind() -> Predicate {
    any_of([
        has_managed_resource_reference_kind(ManagedKind(managed_gvk())),
        has_class_reference_kind(ClassKind(class_gvk())),
    ])
}

#[test]
fn selector_claims_gate_on_absence() {
    let p = needs_class_selection();
    let fresh = Resource::claim("c").with_class_selector(Some(LabelSelector::default()));
    assert!(p.matches(&fresh));

    let classed = fresh.clone().with_class_ref(Some(reference(&class_gvk())));
    assert!(!p.matches(&classed));

    let unselected = Resource::claim("c");
    assert!(!p.matches(&unselected));
    assert!(has_no_class_selector().matches(&unselected));
}

#[test]
fn bind_gate_accepts_either_reference() {
    let p = ready_to_bind();
    assert!(p.matches(&Resource::claim("c").with_class_ref(Some(reference(&class_gvk())))));
    assert!(p.matches(&Resource::claim("c").with_resource_ref(Some(reference(&managed_gvk())))));
    assert!(!p.matches(&Resource::claim("c").with_class_ref(Some(reference(&managed_gvk())))));
    assert!(!p.matches(&Resource::new("not-a-claim")));
}

#[test]
fn classifiers_are_idempotent() {
    let obj = Resource::claim("c")
        .with_class_selector(Some(LabelSelector::default()))
        .with_annotation("crossplane.io/propagate-to-namespace", "ns");
    let all = [
        needs_class_selection(),
        ready_to_bind(),
        is_propagator(),
        is_propagated(),
        has_no_class_selector(),
    ];
    for p in &all {
        assert_eq!(p.matches(&obj), p.matches(&obj));
    }
}

#[test]
fn predicates_are_shared_across_threads() {
    let p = needs_class_selection();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let p = p.clone();
            std::thread::spawn(move || {
                let obj = Resource::claim(format!("c{i}")).with_class_selector(Some(LabelSelector::default()));
                p.matches(&obj)
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}
