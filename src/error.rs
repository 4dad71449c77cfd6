//! Error taxonomy for policy updates.
//!
//! Every failure is reported before any output is produced, so callers can
//! tell an invalid request apart from a manifest they cannot patch.

use crate::policy::Policy;
use crate::resource::ResourceId;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A tag-filter value failed its pattern validator.
    #[error("invalid tag pattern {value:?} for {policy}: {reason}")]
    InvalidPattern {
        policy: Policy,
        value: String,
        reason: String,
    },

    /// No document in the manifest matches the resource identifier.
    #[error("resource {id} not found in manifest")]
    ResourceNotFound { id: ResourceId },

    /// The block scanner could not interpret the structure around the target.
    #[error("malformed manifest at line {line}: {reason}")]
    MalformedManifest { line: usize, reason: String },

    #[error("invalid resource id {input:?}: {reason}")]
    InvalidResourceId { input: String, reason: String },

    #[error("unknown policy {0:?}")]
    UnknownPolicy(String),

    /// Raised by namespacer implementations that cannot resolve a namespace.
    #[error("cannot resolve namespace for {kind}: {reason}")]
    Namespace { kind: String, reason: String },

    #[error("manifest is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

impl Error {
    /// Build a [`Error::MalformedManifest`] pointing at the line containing `offset`.
    pub(crate) fn malformed(src: &str, offset: usize, reason: impl Into<String>) -> Self {
        let offset = offset.min(src.len());
        Error::MalformedManifest {
            line: src[..offset].matches('\n').count() + 1,
            reason: reason.into(),
        }
    }
}
