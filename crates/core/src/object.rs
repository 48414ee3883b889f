//! Object views and the optional capabilities an object may support.
//!
//! Not every object supports every capability. An object that does not
//! support one answers `None` from the matching `as_*` accessor; an object
//! that supports it but holds nothing answers `Some(view)` whose getter
//! yields `None`. Classifiers rely on the two being distinct.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::{Gvk, LabelSelector, ObjectRef, OwnerRef};

/// Exposes the claim a managed resource is bound to.
pub trait ClaimReferencer {
    fn claim_reference(&self) -> Option<&ObjectRef>;
}

/// Exposes the resource class an object was provisioned from.
pub trait ClassReferencer {
    fn class_reference(&self) -> Option<&ObjectRef>;
}

/// Exposes the label selector a claim uses to pick a resource class.
pub trait ClassSelector {
    fn class_selector(&self) -> Option<&LabelSelector>;
}

/// Exposes the managed resource a claim is bound to.
pub trait ManagedResourceReferencer {
    fn resource_reference(&self) -> Option<&ObjectRef>;
}

/// Read-only snapshot of a cluster object as delivered by the watch subsystem.
pub trait Object {
    fn namespace(&self) -> Option<&str>;
    fn name(&self) -> &str;

    fn uid(&self) -> Option<&str> {
        None
    }

    /// Declared type, if the snapshot carries one.
    fn type_meta(&self) -> Option<Gvk> {
        None
    }

    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        None
    }

    /// `None` when the object has no annotation map at all.
    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        None
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations().and_then(|a| a.get(key)).map(String::as_str)
    }

    fn owner_references(&self) -> &[OwnerRef] {
        &[]
    }

    fn as_claim_referencer(&self) -> Option<&dyn ClaimReferencer> {
        None
    }

    fn as_class_referencer(&self) -> Option<&dyn ClassReferencer> {
        None
    }

    fn as_class_selector(&self) -> Option<&dyn ClassSelector> {
        None
    }

    fn as_managed_resource_referencer(&self) -> Option<&dyn ManagedResourceReferencer> {
        None
    }
}

/// Support for one capability: either absent, or present with an optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Unsupported,
    Supported(Option<T>),
}

impl<T> Default for Capability<T> {
    fn default() -> Self {
        Capability::Unsupported
    }
}

impl<T> Capability<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Supported(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Capability::Supported(v) => v.as_ref(),
            Capability::Unsupported => None,
        }
    }
}

/// In-memory object with configurable capabilities.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    pub gvk: Option<Gvk>,
    pub namespace: Option<String>,
    pub name: String,
    pub uid: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
    pub annotations: Option<BTreeMap<String, String>>,
    pub owner_references: SmallVec<[OwnerRef; 2]>,
    pub claim_ref: Capability<ObjectRef>,
    pub class_ref: Capability<ObjectRef>,
    pub class_selector: Capability<LabelSelector>,
    pub resource_ref: Capability<ObjectRef>,
}

impl Resource {
    /// Object supporting no capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Claim shape: class selector, class reference and managed resource
    /// reference are supported, all empty.
    pub fn claim(name: impl Into<String>) -> Self {
        Self {
            class_ref: Capability::Supported(None),
            class_selector: Capability::Supported(None),
            resource_ref: Capability::Supported(None),
            ..Self::new(name)
        }
    }

    /// Managed resource shape: claim and class references supported, both empty.
    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            claim_ref: Capability::Supported(None),
            class_ref: Capability::Supported(None),
            ..Self::new(name)
        }
    }

    pub fn in_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = Some(ns.into());
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_gvk(mut self, gvk: Gvk) -> Self {
        self.gvk = Some(gvk);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.get_or_insert_with(BTreeMap::new).insert(key.into(), value.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner_references.push(owner);
        self
    }

    pub fn with_claim_ref(mut self, r: Option<ObjectRef>) -> Self {
        self.claim_ref = Capability::Supported(r);
        self
    }

    pub fn with_class_ref(mut self, r: Option<ObjectRef>) -> Self {
        self.class_ref = Capability::Supported(r);
        self
    }

    pub fn with_class_selector(mut self, s: Option<LabelSelector>) -> Self {
        self.class_selector = Capability::Supported(s);
        self
    }

    pub fn with_resource_ref(mut self, r: Option<ObjectRef>) -> Self {
        self.resource_ref = Capability::Supported(r);
        self
    }
}

impl ClaimReferencer for Resource {
    fn claim_reference(&self) -> Option<&ObjectRef> {
        self.claim_ref.get()
    }
}

impl ClassReferencer for Resource {
    fn class_reference(&self) -> Option<&ObjectRef> {
        self.class_ref.get()
    }
}

impl ClassSelector for Resource {
    fn class_selector(&self) -> Option<&LabelSelector> {
        self.class_selector.get()
    }
}

impl ManagedResourceReferencer for Resource {
    fn resource_reference(&self) -> Option<&ObjectRef> {
        self.resource_ref.get()
    }
}

impl Object for Resource {
    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    fn type_meta(&self) -> Option<Gvk> {
        self.gvk.clone()
    }

    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.labels.as_ref()
    }

    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.annotations.as_ref()
    }

    fn owner_references(&self) -> &[OwnerRef] {
        &self.owner_references
    }

    fn as_claim_referencer(&self) -> Option<&dyn ClaimReferencer> {
        self.claim_ref.is_supported().then_some(self as &dyn ClaimReferencer)
    }

    fn as_class_referencer(&self) -> Option<&dyn ClassReferencer> {
        self.class_ref.is_supported().then_some(self as &dyn ClassReferencer)
    }

    fn as_class_selector(&self) -> Option<&dyn ClassSelector> {
        self.class_selector.is_supported().then_some(self as &dyn ClassSelector)
    }

    fn as_managed_resource_referencer(&self) -> Option<&dyn ManagedResourceReferencer> {
        self.resource_ref.is_supported().then_some(self as &dyn ManagedResourceReferencer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_differs_from_empty() {
        let plain = Resource::new("a");
        assert!(plain.as_managed_resource_referencer().is_none());

        let claim = Resource::claim("a");
        let view = claim.as_managed_resource_referencer().expect("claim supports resource refs");
        assert!(view.resource_reference().is_none());
        assert!(claim.as_claim_referencer().is_none());
    }

    #[test]
    fn annotation_lookup_without_map() {
        let r = Resource::new("a");
        assert!(r.annotations().is_none());
        assert_eq!(r.annotation("k"), None);
        let r = r.with_annotation("k", "");
        assert_eq!(r.annotation("k"), Some(""));
    }
}
