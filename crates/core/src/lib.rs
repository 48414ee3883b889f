//! Tether core types: work items, references, object views and capabilities

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod gvk;
pub mod object;

pub use gvk::{ClassKind, Gvk, ManagedKind};
pub use object::{
    Capability, ClaimReferencer, ClassReferencer, ClassSelector, ManagedResourceReferencer, Object,
    Resource,
};

// ---- propagation annotations ----
// Set on the source object, naming the copy it propagates to.
pub const ANNOTATION_KEY_PROPAGATE_TO_NAMESPACE: &str = "crossplane.io/propagate-to-namespace";
pub const ANNOTATION_KEY_PROPAGATE_TO_NAME: &str = "crossplane.io/propagate-to-name";
pub const ANNOTATION_KEY_PROPAGATE_TO_UID: &str = "crossplane.io/propagate-to-uid";
// Set on the copy, naming the source it was propagated from.
pub const ANNOTATION_KEY_PROPAGATE_FROM_NAMESPACE: &str = "crossplane.io/propagate-from-namespace";
pub const ANNOTATION_KEY_PROPAGATE_FROM_NAME: &str = "crossplane.io/propagate-from-name";
pub const ANNOTATION_KEY_PROPAGATE_FROM_UID: &str = "crossplane.io/propagate-from-uid";

/// Namespaced identifier scheduled for reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItem {
    pub namespace: String,
    pub name: String,
}

impl WorkItem {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// A present reference to another object. Absence is modelled as `None` by the
/// capability that exposes it, never as an `ObjectRef` with empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl ObjectRef {
    /// Work item identifying the referenced object.
    pub fn work_item(&self) -> WorkItem {
        WorkItem::new(self.namespace.clone(), self.name.clone())
    }

    /// Exact, case-sensitive match of apiVersion (`group/version`) and kind.
    pub fn is_kind(&self, gvk: &Gvk) -> bool {
        self.api_version == gvk.api_version() && self.kind == gvk.kind
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
}

impl OwnerRef {
    /// Only an explicit `controller: true` marks the managing controller.
    pub fn is_controller(&self) -> bool {
        self.controller == Some(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Label selector a claim may carry to pick a resource class.
/// An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<SelectorRequirement>,
}

impl LabelSelector {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let labels_ok = self.match_labels.iter().all(|(k, v)| labels.get(k) == Some(v));
        labels_ok
            && self.match_expressions.iter().all(|req| {
                let got = labels.get(&req.key);
                match req.operator {
                    SelectorOperator::In => got.map_or(false, |v| req.values.contains(v)),
                    SelectorOperator::NotIn => got.map_or(true, |v| !req.values.contains(v)),
                    SelectorOperator::Exists => got.is_some(),
                    SelectorOperator::DoesNotExist => got.is_none(),
                }
            })
    }
}

/// Parses the equality subset of the `kubectl -l` syntax: `k=v`, `k!=v`,
/// `k` (exists) and `!k` (does not exist), comma separated.
impl FromStr for LabelSelector {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sel = LabelSelector::default();
        for term in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let invalid = || RefError::InvalidSelector(term.to_string());
            let requirement = |key: &str, operator, values: Vec<String>| {
                if key.is_empty() {
                    return Err(invalid());
                }
                Ok(SelectorRequirement { key: key.to_string(), operator, values })
            };
            if let Some((k, v)) = term.split_once("!=") {
                let values = vec![v.trim().to_string()];
                sel.match_expressions.push(requirement(k.trim(), SelectorOperator::NotIn, values)?);
            } else if let Some((k, v)) = term.split_once('=') {
                let (k, v) = (k.trim(), v.trim_start_matches('=').trim());
                if k.is_empty() {
                    return Err(invalid());
                }
                sel.match_labels.insert(k.to_string(), v.to_string());
            } else if let Some(k) = term.strip_prefix('!') {
                let req = requirement(k.trim(), SelectorOperator::DoesNotExist, Vec::new())?;
                sel.match_expressions.push(req);
            } else {
                sel.match_expressions.push(requirement(term, SelectorOperator::Exists, Vec::new())?);
            }
        }
        Ok(sel)
    }
}

/// Failure to determine an object's group-version-kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("object is missing type metadata")]
    MissingTypeMeta,
    #[error("no kind is registered for {0}")]
    NotRegistered(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RefError {
    #[error("invalid gvk key: {0} (expect v1/Kind or group/v1/Kind)")]
    InvalidGvkKey(String),
    #[error("invalid label selector term: {0}")]
    InvalidSelector(String),
    #[error("malformed {field}: {source}")]
    Malformed {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Object-change notification delivered by the watch subsystem.
#[derive(Clone, Copy)]
pub enum Event<'a> {
    Create(&'a dyn Object),
    Update { old: &'a dyn Object, new: &'a dyn Object },
    Delete(&'a dyn Object),
    Generic(&'a dyn Object),
}

impl<'a> Event<'a> {
    /// The object the event is about; the new object for updates.
    pub fn object(&self) -> &'a dyn Object {
        match *self {
            Event::Create(o) | Event::Delete(o) | Event::Generic(o) => o,
            Event::Update { new, .. } => new,
        }
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Event::Create(_) => "Create",
            Event::Update { .. } => "Update",
            Event::Delete(_) => "Delete",
            Event::Generic(_) => "Generic",
        };
        let o = self.object();
        write!(f, "{}({}/{})", kind, o.namespace().unwrap_or_default(), o.name())
    }
}

pub mod prelude {
    pub use super::{
        ClaimReferencer, ClassKind, ClassReferencer, ClassSelector, Event, Gvk, LabelSelector,
        ManagedKind, ManagedResourceReferencer, Object, ObjectRef, OwnerRef, Resource, TypeError,
        WorkItem,
    };
}
