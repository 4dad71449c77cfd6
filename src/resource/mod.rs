//! Resource identity and policy update requests.
//!
//! - `ResourceId`: `namespace:kind/name`
//! - `PolicyUpdate`: add/remove diff against a resource's policies
//! - `Namespacer`: resolves the effective namespace of a manifest document

pub mod id;
pub mod namespacer;
pub mod update;

pub use id::{CLUSTER_SCOPE, ResourceId};
pub use namespacer::{ConstNamespacer, Namespacer};
pub use update::{PolicyUpdate, Resolved};
