//! Policy update requests.
//!
//! An update is a pair of ordered policy sets. When a policy appears in both,
//! removal wins: the policy is removed and never re-added by the same update.

use crate::error::{Error, Result};
use crate::policy::pattern::PATTERN_ALL;
use crate::policy::{Pattern, Policy, Set};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    #[serde(default)]
    add: Set,
    #[serde(default)]
    remove: Set,
}

/// An update resolved against one workload: the all-containers tag policy has
/// been expanded and conflicts between add and remove settled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub add: Set,
    pub remove: Set,
}

impl PolicyUpdate {
    pub fn new(add: Set, remove: Set) -> Self {
        Self { add, remove }
    }

    pub fn add(&self) -> &Set {
        &self.add
    }

    pub fn remove(&self) -> &Set {
        &self.remove
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Union of two updates. Values from `other` win for policies in both.
    pub fn merge(mut self, other: PolicyUpdate) -> Self {
        self.add.extend(other.add);
        self.remove.extend(other.remove);
        self
    }

    /// Check every tag filter being added. The first invalid one is reported.
    pub fn validate(&self) -> Result<()> {
        for (policy, value) in self.add.iter().filter(|(p, _)| p.is_tag()) {
            Pattern::new(value).map_err(|err| Error::InvalidPattern {
                policy: policy.clone(),
                value: value.to_string(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }

    /// Whether resolving needs the workload's container names.
    pub fn needs_containers(&self) -> bool {
        self.add
            .policies()
            .chain(self.remove.policies())
            .any(Policy::is_tag_all)
    }

    /// Expand the all-containers tag policy over `containers` and apply the
    /// remove-wins rule.
    ///
    /// Adding the match-everything filter to all containers removes their
    /// filters instead, since an unfiltered container is the same thing.
    pub fn resolve(&self, containers: &[String]) -> Resolved {
        let mut add = self.add.clone();
        let mut remove = self.remove.clone();

        if let Some(value) = add.remove(&Policy::tag_all()) {
            for container in containers {
                if value == PATTERN_ALL {
                    remove.insert(Policy::tag(container.as_str()), value.as_str());
                } else {
                    add.insert(Policy::tag(container.as_str()), value.as_str());
                }
            }
        }
        if let Some(value) = remove.remove(&Policy::tag_all()) {
            for container in containers {
                remove.insert(Policy::tag(container.as_str()), value.as_str());
            }
        }

        add.retain(|policy| !remove.contains(policy));
        Resolved { add, remove }
    }
}
