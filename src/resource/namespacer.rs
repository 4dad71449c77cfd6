//! Namespace resolution for manifest documents.

use crate::error::Result;
use crate::resource::CLUSTER_SCOPE;

/// Resolves the namespace a document effectively lives in.
///
/// Documents often leave `metadata.namespace` out and rely on whatever the
/// cluster or tooling defaults it to; implementations supply that policy.
pub trait Namespacer {
    fn effective_namespace(&self, declared: Option<&str>, kind: &str) -> Result<String>;
}

impl<N: Namespacer + ?Sized> Namespacer for &N {
    fn effective_namespace(&self, declared: Option<&str>, kind: &str) -> Result<String> {
        (**self).effective_namespace(declared, kind)
    }
}

// Kinds that never carry a namespace.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "namespace",
    "node",
    "persistentvolume",
    "storageclass",
    "clusterrole",
    "clusterrolebinding",
    "customresourcedefinition",
    "podsecuritypolicy",
    "priorityclass",
    "mutatingwebhookconfiguration",
    "validatingwebhookconfiguration",
];

/// Falls back to a fixed namespace when a document declares none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstNamespacer(String);

impl ConstNamespacer {
    pub fn new(default: impl Into<String>) -> Self {
        Self(default.into())
    }
}

impl Namespacer for ConstNamespacer {
    fn effective_namespace(&self, declared: Option<&str>, kind: &str) -> Result<String> {
        if CLUSTER_SCOPED_KINDS.contains(&kind.to_ascii_lowercase().as_str()) {
            return Ok(CLUSTER_SCOPE.to_string());
        }
        Ok(declared.unwrap_or(&self.0).to_string())
    }
}
