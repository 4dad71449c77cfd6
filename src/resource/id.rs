//! Resource identifiers.
//!
//! Compact form: `<namespace>:<kind>/<name>`, e.g. `default:deployment/nginx`.
//! Kinds compare case-insensitively, so they are stored lowercased.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Namespace token for cluster-scoped resources.
pub const CLUSTER_SCOPE: &str = "<cluster>";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    namespace: String,
    kind: String,
    name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, kind: &str, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.to_ascii_lowercase(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> (&str, &str, &str) {
        (&self.namespace, &self.kind, &self.name)
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.namespace == CLUSTER_SCOPE
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidResourceId {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let (namespace, rest) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <namespace>:<kind>/<name>"))?;
        let (kind, name) = rest
            .split_once('/')
            .ok_or_else(|| invalid("expected <kind>/<name> after the namespace"))?;
        if namespace.is_empty() {
            return Err(invalid("empty namespace"));
        }
        if kind.is_empty() {
            return Err(invalid("empty kind"));
        }
        if name.is_empty() || name.contains('/') {
            return Err(invalid("name must be non-empty and contain no '/'"));
        }
        Ok(ResourceId::new(namespace, kind, name))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.namespace, self.kind, self.name)
    }
}
