//! `DynamicObject` viewed as a tether object.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tether_core::{
    Capability, ClaimReferencer, ClassReferencer, ClassSelector, Gvk, LabelSelector,
    ManagedResourceReferencer, Object, ObjectRef, OwnerRef, RefError,
};

/// Which capabilities objects of a watched kind support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// `spec.classSelector`, `spec.classRef`, `spec.resourceRef`
    Claim,
    /// `spec.claimRef`, `spec.classRef`
    Managed,
    Plain,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "claim" => Ok(Role::Claim),
            "managed" => Ok(Role::Managed),
            "plain" => Ok(Role::Plain),
            other => Err(format!("unknown role: {other} (expect claim, managed or plain)")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Claim => "claim",
            Role::Managed => "managed",
            Role::Plain => "plain",
        })
    }
}

pub struct KubeObject {
    obj: DynamicObject,
    owners: Vec<OwnerRef>,
    claim_ref: Capability<ObjectRef>,
    class_ref: Capability<ObjectRef>,
    class_selector: Capability<LabelSelector>,
    resource_ref: Capability<ObjectRef>,
}

// Unsupported for roles without the field; a null or missing field is an empty capability.
fn spec_field<T: DeserializeOwned>(
    obj: &DynamicObject,
    supported: bool,
    key: &str,
    field: &'static str,
) -> Result<Capability<T>, RefError> {
    if !supported {
        return Ok(Capability::Unsupported);
    }
    match obj.data.get("spec").and_then(|s| s.get(key)) {
        None | Some(serde_json::Value::Null) => Ok(Capability::Supported(None)),
        Some(v) => serde_json::from_value(v.clone())
            .map(|t| Capability::Supported(Some(t)))
            .map_err(|source| RefError::Malformed { field, source }),
    }
}

impl KubeObject {
    pub fn new(obj: DynamicObject, role: Role) -> Result<Self, RefError> {
        let claim = role == Role::Claim;
        let managed = role == Role::Managed;
        let claim_ref = spec_field(&obj, managed, "claimRef", "spec.claimRef")?;
        let class_ref = spec_field(&obj, claim || managed, "classRef", "spec.classRef")?;
        let class_selector = spec_field(&obj, claim, "classSelector", "spec.classSelector")?;
        let resource_ref = spec_field(&obj, claim, "resourceRef", "spec.resourceRef")?;
        let owners = obj
            .metadata
            .owner_references
            .iter()
            .flatten()
            .map(|o| OwnerRef {
                api_version: o.api_version.clone(),
                kind: o.kind.clone(),
                name: o.name.clone(),
                uid: o.uid.clone(),
                controller: o.controller,
            })
            .collect();
        Ok(Self { obj, owners, claim_ref, class_ref, class_selector, resource_ref })
    }

    /// Parse a manifest (JSON or YAML already decoded to JSON).
    pub fn from_manifest(raw: serde_json::Value, role: Role) -> anyhow::Result<Self> {
        let obj: DynamicObject = serde_json::from_value(raw)?;
        Ok(Self::new(obj, role)?)
    }

    pub fn inner(&self) -> &DynamicObject {
        &self.obj
    }

    /// Stable identity across events: UID, or `namespace/name` when absent.
    pub fn key(&self) -> String {
        object_key(&self.obj)
    }
}

/// Identity of a raw object, readable even when its spec does not parse.
pub fn object_key(obj: &DynamicObject) -> String {
    let meta = &obj.metadata;
    match meta.uid.as_deref() {
        Some(uid) => uid.to_string(),
        None => format!(
            "{}/{}",
            meta.namespace.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or_default()
        ),
    }
}

impl fmt::Debug for KubeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeObject")
            .field("namespace", &self.namespace())
            .field("name", &self.name())
            .field("type", &self.type_meta())
            .finish()
    }
}

impl ClaimReferencer for KubeObject {
    fn claim_reference(&self) -> Option<&ObjectRef> {
        self.claim_ref.get()
    }
}

impl ClassReferencer for KubeObject {
    fn class_reference(&self) -> Option<&ObjectRef> {
        self.class_ref.get()
    }
}

impl ClassSelector for KubeObject {
    fn class_selector(&self) -> Option<&LabelSelector> {
        self.class_selector.get()
    }
}

impl ManagedResourceReferencer for KubeObject {
    fn resource_reference(&self) -> Option<&ObjectRef> {
        self.resource_ref.get()
    }
}

impl Object for KubeObject {
    fn namespace(&self) -> Option<&str> {
        self.obj.metadata.namespace.as_deref()
    }

    fn name(&self) -> &str {
        self.obj.metadata.name.as_deref().unwrap_or_default()
    }

    fn uid(&self) -> Option<&str> {
        self.obj.metadata.uid.as_deref()
    }

    fn type_meta(&self) -> Option<Gvk> {
        self.obj.types.as_ref().map(|t| Gvk::from_api_version(&t.api_version, &t.kind))
    }

    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.obj.metadata.labels.as_ref()
    }

    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.obj.metadata.annotations.as_ref()
    }

    fn owner_references(&self) -> &[OwnerRef] {
        &self.owners
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
