//! Ordered policy sets.
//!
//! Insertion order is kept so that newly added annotations render in the
//! order the caller supplied them.

use crate::policy::Policy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Set(IndexMap<Policy, String>);

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Set::insert`].
    pub fn with(mut self, policy: Policy, value: impl Into<String>) -> Self {
        self.insert(policy, value);
        self
    }

    /// Set a policy's value. An existing policy keeps its position.
    pub fn insert(&mut self, policy: Policy, value: impl Into<String>) {
        self.0.insert(policy, value.into());
    }

    /// Remove a policy, keeping the relative order of the rest.
    pub fn remove(&mut self, policy: &Policy) -> Option<String> {
        self.0.shift_remove(policy)
    }

    pub fn get(&self, policy: &Policy) -> Option<&str> {
        self.0.get(policy).map(String::as_str)
    }

    pub fn contains(&self, policy: &Policy) -> bool {
        self.0.contains_key(policy)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Policy) -> bool) {
        self.0.retain(|policy, _| keep(policy));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Policy, &str)> {
        self.0.iter().map(|(p, v)| (p, v.as_str()))
    }

    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Policy, String)> for Set {
    fn from_iter<I: IntoIterator<Item = (Policy, String)>>(iter: I) -> Self {
        Set(iter.into_iter().collect())
    }
}

impl Extend<(Policy, String)> for Set {
    fn extend<I: IntoIterator<Item = (Policy, String)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Set {
    type Item = (Policy, String);
    type IntoIter = indexmap::map::IntoIter<Policy, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
