//! Tether predicates: boolean classifiers over a single object snapshot.
//!
//! A [`Predicate`] is pure: it sees only the object it is given, keeps no
//! state between calls and may be evaluated concurrently from any thread.
//! Classifiers never fail. Anything they cannot determine is a definite
//! `false` for the "has X" family and a definite `true` for the "has no X"
//! family.

#![forbid(unsafe_code)]

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use tether_core::Object;

pub mod event;
pub mod kind;
pub mod presence;
pub mod propagation;

pub use event::EventPredicates;
pub use kind::{
    has_class_reference_kind, has_managed_resource_reference_kind, is_controlled_by_kind,
    is_managed_kind, DeclaredTypeResolver, Scheme, TypeResolver,
};
pub use presence::{
    has_class_selector, has_labels, has_no_class_reference, has_no_class_selector,
    has_no_managed_resource_reference,
};
pub use propagation::{is_propagated, is_propagator, propagated_from, propagated_to};

/// Cheaply cloneable boolean function over an object snapshot.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&dyn Object) -> bool + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&dyn Object) -> bool + Send + Sync + 'static,
    {
        Predicate(Arc::new(f))
    }

    pub fn matches(&self, obj: &dyn Object) -> bool {
        (self.0)(obj)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::new(move |o| !self.matches(o))
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        all_of([self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        any_of([self, rhs])
    }
}

/// Passes when at least one of `ps` passes. No predicates never pass.
pub fn any_of<I>(ps: I) -> Predicate
where
    I: IntoIterator<Item = Predicate>,
{
    let ps: Vec<Predicate> = ps.into_iter().collect();
    Predicate::new(move |o| ps.iter().any(|p| p.matches(o)))
}

/// Passes when every one of `ps` passes. No predicates always pass.
pub fn all_of<I>(ps: I) -> Predicate
where
    I: IntoIterator<Item = Predicate>,
{
    let ps: Vec<Predicate> = ps.into_iter().collect();
    Predicate::new(move |o| ps.iter().all(|p| p.matches(o)))
}
