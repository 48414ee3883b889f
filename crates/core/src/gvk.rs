//! Group/Version/Kind identifiers and the kind tags controllers are built against.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RefError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { group: group.into(), version: version.into(), kind: kind.into() }
    }

    /// Split an `apiVersion` (`group/version`, or bare `version` for the core group).
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// `group/version`, or the bare version for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Key in `v1/Kind` or `group/v1/Kind` form.
    pub fn key(&self) -> String {
        format!("{}/{}", self.api_version(), self.kind)
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Gvk {
    type Err = RefError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = key.split('/').collect();
        match parts.as_slice() {
            [version, kind] if !version.is_empty() && !kind.is_empty() => Ok(Gvk::new("", *version, *kind)),
            [group, version, kind] if !group.is_empty() && !version.is_empty() && !kind.is_empty() => {
                Ok(Gvk::new(*group, *version, *kind))
            }
            _ => Err(RefError::InvalidGvkKey(key.to_string())),
        }
    }
}

/// Kind of managed resource a controller reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagedKind(pub Gvk);

/// Kind of resource class a controller reconciles against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassKind(pub Gvk);

impl ManagedKind {
    pub fn gvk(&self) -> &Gvk {
        &self.0
    }
}

impl ClassKind {
    pub fn gvk(&self) -> &Gvk {
        &self.0
    }
}

impl From<Gvk> for ManagedKind {
    fn from(g: Gvk) -> Self {
        ManagedKind(g)
    }
}

impl From<Gvk> for ClassKind {
    fn from(g: Gvk) -> Self {
        ClassKind(g)
    }
}
