//! Policy model: the closed set of recognised policies and their annotation names.
//!
//! Fixed policies map to `flux.weave.works/<name>`; tag filters are scoped to a
//! container and map to `flux.weave.works/tag.<container>`. The container
//! token `*` is reserved and means "every container of the workload".

pub mod pattern;
pub mod set;

pub use pattern::{Pattern, PatternError};
pub use set::Set;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every policy annotation.
pub const ANNOTATION_PREFIX: &str = "flux.weave.works/";

/// Reserved container token for tag policies that apply to all containers.
pub const ALL_CONTAINERS: &str = "*";

const TAG_PREFIX: &str = "tag.";
// Older spelling of `tag.*`, still accepted on input.
const TAG_ALL_ALIAS: &str = "tag_all";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Policy {
    Ignore,
    Locked,
    LockedUser,
    LockedMsg,
    Automated,
    /// Tag filter for one container, or [`ALL_CONTAINERS`].
    Tag(String),
}

impl Policy {
    /// Tag filter policy for `container`.
    pub fn tag(container: impl Into<String>) -> Self {
        Policy::Tag(container.into())
    }

    /// Tag filter policy for every container of the workload.
    pub fn tag_all() -> Self {
        Policy::Tag(ALL_CONTAINERS.to_string())
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Policy::Tag(_))
    }

    pub fn is_tag_all(&self) -> bool {
        matches!(self, Policy::Tag(c) if c == ALL_CONTAINERS)
    }

    /// Container a tag policy is scoped to.
    pub fn container(&self) -> Option<&str> {
        match self {
            Policy::Tag(c) => Some(c),
            _ => None,
        }
    }

    /// Policy name without the annotation prefix, e.g. `automated` or `tag.nginx`.
    pub fn name(&self) -> String {
        match self {
            Policy::Ignore => "ignore".to_string(),
            Policy::Locked => "locked".to_string(),
            Policy::LockedUser => "locked_user".to_string(),
            Policy::LockedMsg => "locked_msg".to_string(),
            Policy::Automated => "automated".to_string(),
            Policy::Tag(container) => format!("{TAG_PREFIX}{container}"),
        }
    }

    /// Full annotation key this policy is stored under.
    pub fn annotation(&self) -> String {
        format!("{ANNOTATION_PREFIX}{}", self.name())
    }

    /// Recognise an annotation key. Keys outside the policy prefix, or with an
    /// unknown policy name, are not policies.
    pub fn from_annotation(key: &str) -> Option<Self> {
        key.strip_prefix(ANNOTATION_PREFIX)?.parse().ok()
    }
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let policy = match s {
            "ignore" => Policy::Ignore,
            "locked" => Policy::Locked,
            "locked_user" => Policy::LockedUser,
            "locked_msg" => Policy::LockedMsg,
            "automated" => Policy::Automated,
            TAG_ALL_ALIAS => Policy::tag_all(),
            _ => match s.strip_prefix(TAG_PREFIX) {
                Some(container) if !container.is_empty() && !container.contains(char::is_whitespace) => {
                    Policy::tag(container)
                }
                _ => return Err(Error::UnknownPolicy(s.to_string())),
            },
        };
        Ok(policy)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl TryFrom<String> for Policy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Policy> for String {
    fn from(policy: Policy) -> Self {
        policy.name()
    }
}
