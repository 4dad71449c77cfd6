//! Policy updates on raw manifest text.
//!
//! Manifests are human-authored and version-controlled, so they are never
//! re-serialised. A resource is located by scanning block structure, and only
//! the annotation entries being changed are spliced:
//! - `scan`: documents, lines, block mappings and sequences
//! - `locate`: resources, their metadata and containers
//! - `annotate`: the annotation block patch
//! - `scalar`: quoting of rendered values

mod annotate;
mod locate;
mod scalar;
mod scan;

use crate::error::{Error, Result};
use crate::policy::{Policy, Set};
use crate::resource::{Namespacer, PolicyUpdate, ResourceId};
use locate::Resource;
use scan::Line;

/// Entry point for reading and updating policies in manifest files.
#[derive(Debug, Clone)]
pub struct Manifests<N> {
    namespacer: N,
}

impl<N: Namespacer> Manifests<N> {
    pub fn new(namespacer: N) -> Self {
        Self { namespacer }
    }

    /// Apply `update` to the annotations of resource `id` in `def`.
    ///
    /// Tag filters are validated before anything else, so an invalid update
    /// fails even when `def` is empty. On success the returned bytes differ
    /// from `def` only within the resource's `metadata.annotations`.
    pub fn update_workload_policies(
        &self,
        def: &[u8],
        id: &ResourceId,
        update: &PolicyUpdate,
    ) -> Result<Vec<u8>> {
        update.validate()?;

        let src = std::str::from_utf8(def)?;
        let docs = scan::documents(src);
        let resource = self.locate(src, &docs, id)?;

        let containers = if update.needs_containers() {
            let containers = resource.containers(src)?;
            if containers.is_empty() {
                tracing::warn!(resource = %id, "no containers found for all-containers tag policy");
            }
            containers
        } else {
            Vec::new()
        };
        let resolved = update.resolve(&containers);

        let add: Vec<(String, String)> = resolved
            .add
            .iter()
            .map(|(policy, value)| (policy.annotation(), value.to_string()))
            .collect();
        let remove: Vec<String> = resolved.remove.policies().map(Policy::annotation).collect();

        let splices = annotate::patch(src, &resource, &add, &remove)?;
        Ok(annotate::apply(src, splices).into_bytes())
    }

    /// Policies currently set on resource `id`.
    pub fn workload_policies(&self, def: &[u8], id: &ResourceId) -> Result<Set> {
        let src = std::str::from_utf8(def)?;
        let docs = scan::documents(src);
        let resource = self.locate(src, &docs, id)?;
        annotate::policies(src, &resource)
    }

    /// Identifiers of every resource in `def`, in document order.
    pub fn resource_ids(&self, def: &[u8]) -> Result<Vec<ResourceId>> {
        let src = std::str::from_utf8(def)?;
        let docs = scan::documents(src);
        locate::resources(src, &docs)?
            .iter()
            .map(|resource| self.id_of(resource))
            .collect()
    }

    fn locate<'a>(&self, src: &str, docs: &'a [Vec<Line>], id: &ResourceId) -> Result<Resource<'a>> {
        for resource in locate::resources(src, docs)? {
            if self.id_of(&resource)? == *id {
                tracing::debug!(resource = %id, "located resource");
                return Ok(resource);
            }
        }
        Err(Error::ResourceNotFound { id: id.clone() })
    }

    fn id_of(&self, resource: &Resource<'_>) -> Result<ResourceId> {
        let namespace = self
            .namespacer
            .effective_namespace(resource.namespace.as_deref(), &resource.kind)?;
        Ok(ResourceId::new(namespace, &resource.kind, resource.name.as_str()))
    }
}
