//! Policy annotations on workload manifests.
//!
//! GitOps policies (automation, locking, per-container tag filters) live as
//! annotations on a workload's metadata. This crate adds and removes them in
//! raw manifest text while leaving every other byte of the file as written.
//!
//! ```
//! use workload_policy::{ConstNamespacer, Manifests, Policy, PolicyUpdate, ResourceId, Set};
//!
//! let manifest = "kind: Deployment\nmetadata:\n  name: nginx # web\nspec: {}\n";
//! let id: ResourceId = "default:deployment/nginx".parse()?;
//! let update = PolicyUpdate::new(Set::new().with(Policy::Automated, "true"), Set::new());
//!
//! let manifests = Manifests::new(ConstNamespacer::new("default"));
//! let out = manifests.update_workload_policies(manifest.as_bytes(), &id, &update)?;
//! assert_eq!(
//!     String::from_utf8(out)?,
//!     "kind: Deployment\nmetadata:\n  name: nginx # web\n  annotations:\n    flux.weave.works/automated: 'true'\nspec: {}\n"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod manifest;
pub mod policy;
pub mod resource;

pub use error::{Error, Result};
pub use manifest::Manifests;
pub use policy::{Pattern, Policy, Set};
pub use resource::{ConstNamespacer, Namespacer, PolicyUpdate, ResourceId};
