//! Kind and ownership classifiers.

use rustc_hash::FxHashMap;
use tether_core::{ClassKind, Gvk, ManagedKind, Object, TypeError};
use tracing::trace;

use crate::Predicate;

/// Determines the group-version-kinds an object is known as.
pub trait TypeResolver: Send + Sync {
    fn object_kinds(&self, obj: &dyn Object) -> Result<Vec<Gvk>, TypeError>;
}

impl<F> TypeResolver for F
where
    F: Fn(&dyn Object) -> Result<Vec<Gvk>, TypeError> + Send + Sync,
{
    fn object_kinds(&self, obj: &dyn Object) -> Result<Vec<Gvk>, TypeError> {
        self(obj)
    }
}

/// Trusts the type an object declares about itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredTypeResolver;

impl TypeResolver for DeclaredTypeResolver {
    fn object_kinds(&self, obj: &dyn Object) -> Result<Vec<Gvk>, TypeError> {
        obj.type_meta().map(|g| vec![g]).ok_or(TypeError::MissingTypeMeta)
    }
}

/// Registry of known kinds. A declared kind may be registered under several
/// group-version-kinds, e.g. when one schema is served at two versions.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: FxHashMap<Gvk, Vec<Gvk>>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gvk: Gvk) -> &mut Self {
        self.register_as(gvk.clone(), gvk)
    }

    /// Objects declaring `declared` are also known as `known_as`.
    pub fn register_as(&mut self, declared: Gvk, known_as: Gvk) -> &mut Self {
        let kinds = self.kinds.entry(declared).or_default();
        if !kinds.contains(&known_as) {
            kinds.push(known_as);
        }
        self
    }
}

impl TypeResolver for Scheme {
    fn object_kinds(&self, obj: &dyn Object) -> Result<Vec<Gvk>, TypeError> {
        let declared = obj.type_meta().ok_or(TypeError::MissingTypeMeta)?;
        self.kinds
            .get(&declared)
            .cloned()
            .ok_or_else(|| TypeError::NotRegistered(declared.key()))
    }
}

/// Object references a managed resource of the supplied kind.
pub fn has_managed_resource_reference_kind(k: ManagedKind) -> Predicate {
    Predicate::new(move |obj| {
        obj.as_managed_resource_referencer()
            .and_then(|r| r.resource_reference())
            .map_or(false, |r| r.is_kind(k.gvk()))
    })
}

/// Object references a resource class of the supplied kind.
pub fn has_class_reference_kind(k: ClassKind) -> Predicate {
    Predicate::new(move |obj| {
        obj.as_class_referencer()
            .and_then(|r| r.class_reference())
            .map_or(false, |r| r.is_kind(k.gvk()))
    })
}

/// Object is known to `resolver` as the supplied managed kind. An object
/// whose kind cannot be determined is not of the kind.
pub fn is_managed_kind<R>(k: ManagedKind, resolver: R) -> Predicate
where
    R: TypeResolver + 'static,
{
    Predicate::new(move |obj| match resolver.object_kinds(obj) {
        Ok(kinds) => kinds.contains(k.gvk()),
        Err(e) => {
            trace!(error = %e, name = obj.name(), ns = ?obj.namespace(), "cannot determine object kind");
            false
        }
    })
}

/// Object's controller reference points at an object of the supplied kind.
pub fn is_controlled_by_kind(k: Gvk) -> Predicate {
    let api_version = k.api_version();
    Predicate::new(move |obj| {
        obj.owner_references()
            .iter()
            .any(|o| o.is_controller() && o.api_version == api_version && o.kind == k.kind)
    })
}
