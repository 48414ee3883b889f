//! Capability-presence gates.
//!
//! "Has X" answers `false` when the object cannot carry X at all. "Has no X"
//! answers `true` in that case: an object that cannot carry X has none of it.

use std::collections::BTreeMap;

use tether_core::{LabelSelector, Object};

use crate::Predicate;

/// Object supports a class selector and has one set.
pub fn has_class_selector() -> Predicate {
    Predicate::new(|obj| selector_set(obj) == Some(true))
}

/// Object cannot carry a class selector, or has none set.
pub fn has_no_class_selector() -> Predicate {
    Predicate::new(|obj| selector_set(obj) != Some(true))
}

/// Object cannot reference a resource class, or references none.
pub fn has_no_class_reference() -> Predicate {
    Predicate::new(|obj| {
        obj.as_class_referencer()
            .map_or(true, |r| r.class_reference().is_none())
    })
}

/// Object cannot reference a managed resource, or references none.
pub fn has_no_managed_resource_reference() -> Predicate {
    Predicate::new(|obj| {
        obj.as_managed_resource_referencer()
            .map_or(true, |r| r.resource_reference().is_none())
    })
}

/// Object's labels satisfy `selector`. An unlabelled object is matched as if
/// it had an empty label set.
pub fn has_labels(selector: LabelSelector) -> Predicate {
    let none = BTreeMap::new();
    Predicate::new(move |obj| selector.matches(obj.labels().unwrap_or(&none)))
}

// None when the capability is unsupported.
fn selector_set(obj: &dyn Object) -> Option<bool> {
    obj.as_class_selector().map(|s| s.class_selector().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{LabelSelector, ObjectRef, Resource};

    #[test]
    fn class_selector() {
        let cases = [
            ("NotAClassSelector", Resource::new("a"), false, true),
            ("NoClassSelector", Resource::claim("a"), false, true),
            (
                "HasClassSelector",
                Resource::claim("a").with_class_selector(Some(LabelSelector::default())),
                true,
                false,
            ),
        ];
        for (name, obj, has, has_no) in cases {
            assert_eq!(has_class_selector().matches(&obj), has, "has_class_selector: {name}");
            assert_eq!(has_no_class_selector().matches(&obj), has_no, "has_no_class_selector: {name}");
        }
    }

    #[test]
    fn class_reference() {
        let p = has_no_class_reference();
        assert!(p.matches(&Resource::new("a")), "NotAClassReferencer");
        assert!(p.matches(&Resource::claim("a")), "NoClassReference");
        assert!(
            !p.matches(&Resource::claim("a").with_class_ref(Some(ObjectRef::default()))),
            "HasClassReference"
        );
    }

    #[test]
    fn managed_resource_reference() {
        let p = has_no_managed_resource_reference();
        assert!(p.matches(&Resource::new("a")), "NotAManagedResourceReferencer");
        assert!(p.matches(&Resource::claim("a")), "NoManagedResourceReference");
        assert!(
            !p.matches(&Resource::claim("a").with_resource_ref(Some(ObjectRef::default()))),
            "HasManagedResourceReference"
        );
    }

    #[test]
    fn labels() {
        let sel: LabelSelector = "tier=fast,!legacy".parse().unwrap();
        let p = has_labels(sel);
        assert!(p.matches(&Resource::new("a").with_label("tier", "fast")), "Matches");
        assert!(!p.matches(&Resource::new("a")), "Unlabelled");
        assert!(
            !p.matches(&Resource::new("a").with_label("tier", "fast").with_label("legacy", "y")),
            "Excluded"
        );
        assert!(has_labels(LabelSelector::default()).matches(&Resource::new("a")), "EmptySelector");
    }

    #[test]
    fn repeated_evaluation_is_stable() {
        let obj = Resource::claim("a");
        let p = has_no_class_selector();
        assert_eq!(p.matches(&obj), p.matches(&obj));
    }
}
