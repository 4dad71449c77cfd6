//! Locating resources and the blocks inside them.

use crate::error::{Error, Result};
use crate::manifest::scan::{self, Entry, Line};

/// A document that names a resource: it has a `kind` and a `metadata.name`.
#[derive(Debug, Clone)]
pub(crate) struct Resource<'a> {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub top: Vec<Entry<'a>>,
    pub metadata: Entry<'a>,
    /// Entries of the `metadata` block.
    pub meta: Vec<Entry<'a>>,
}

// Where the pod spec lives, by kind.
const POD_SPEC: &[&str] = &["spec", "template", "spec"];
const CRONJOB_POD_SPEC: &[&str] = &["spec", "jobTemplate", "spec", "template", "spec"];
const CONTAINER_KEYS: &[&str] = &["initContainers", "containers"];

impl<'a> Resource<'a> {
    pub fn annotations(&self) -> Option<&Entry<'a>> {
        scan::find(&self.meta, "annotations")
    }

    /// Names of the workload's containers, init containers first. Resources
    /// without a pod template have none.
    pub fn containers(&self, src: &str) -> Result<Vec<String>> {
        let path = if self.kind.eq_ignore_ascii_case("cronjob") {
            CRONJOB_POD_SPEC
        } else {
            POD_SPEC
        };
        let Some(pod_spec) = descend(src, self.top.clone(), path)? else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        for key in CONTAINER_KEYS {
            let Some(list) = scan::find(&pod_spec, key) else {
                continue;
            };
            for item in scan::sequence_items(src, list.children)? {
                let entries = scan::mapping(src, &item)?;
                if let Some(name) = scan::find(&entries, "name") {
                    names.push(name.scalar(src));
                }
            }
        }
        Ok(names)
    }
}

fn descend<'a>(src: &str, mut entries: Vec<Entry<'a>>, path: &[&str]) -> Result<Option<Vec<Entry<'a>>>> {
    for key in path {
        let Some(entry) = scan::find(&entries, key) else {
            return Ok(None);
        };
        let children = entry.children;
        entries = scan::mapping(src, children)?;
    }
    Ok(Some(entries))
}

/// Every resource in the manifest, in document order.
pub(crate) fn resources<'a>(src: &str, docs: &'a [Vec<Line>]) -> Result<Vec<Resource<'a>>> {
    let mut out = Vec::new();
    for doc in docs {
        match resource(src, doc)? {
            Some(resource) => out.push(resource),
            None => tracing::trace!(
                line = src[..doc[0].start].matches('\n').count() + 1,
                "skipping document that names no resource"
            ),
        }
    }
    Ok(out)
}

fn resource<'a>(src: &str, doc: &'a [Line]) -> Result<Option<Resource<'a>>> {
    // Top-level sequences and flow collections are not resources.
    if let Some(first) = doc.iter().find(|l| !l.is_trivia(src)) {
        if first.text(src).starts_with(['-', '{', '[']) {
            return Ok(None);
        }
    }

    let top = scan::mapping(src, doc)?;
    let Some(kind) = scan::find(&top, "kind").map(|e| e.scalar(src)) else {
        return Ok(None);
    };
    let Some(metadata) = scan::find(&top, "metadata").cloned() else {
        return Ok(None);
    };
    if !metadata.has_block(src) && !matches!(metadata.inline(src), "" | "{}" | "~" | "null") {
        return Err(Error::malformed(
            src,
            metadata.line.start,
            "metadata must be a block mapping",
        ));
    }
    let meta = scan::mapping(src, metadata.children)?;
    let Some(name) = scan::find(&meta, "name").map(|e| e.scalar(src)) else {
        return Ok(None);
    };
    let namespace = scan::find(&meta, "namespace")
        .map(|e| e.scalar(src))
        .filter(|ns| !ns.is_empty());
    if kind.is_empty() || name.is_empty() {
        return Ok(None);
    }

    Ok(Some(Resource {
        kind,
        name,
        namespace,
        top,
        metadata,
        meta,
    }))
}
