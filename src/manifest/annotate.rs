//! Annotation block patcher.
//!
//! Computes the byte splices that turn a resource's `metadata.annotations`
//! into the requested set, touching nothing outside the annotation entries
//! being removed or the point where new ones are appended.

use crate::error::{Error, Result};
use crate::manifest::locate::Resource;
use crate::manifest::scalar;
use crate::manifest::scan::{self, Entry};
use crate::policy::{Policy, Set};
use std::collections::HashSet;
use std::ops::Range;

/// Replace `range` of the source with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Splice {
    pub range: Range<usize>,
    pub text: String,
}

impl Splice {
    fn insert(at: usize, text: String) -> Self {
        Self { range: at..at, text }
    }

    fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }
}

/// Apply non-overlapping splices to `src`.
pub(crate) fn apply(src: &str, mut splices: Vec<Splice>) -> String {
    splices.sort_by_key(|s| (s.range.start, s.range.end));
    let extra: usize = splices.iter().map(|s| s.text.len()).sum();
    let mut out = String::with_capacity(src.len() + extra);
    let mut cursor = 0;
    for splice in splices {
        debug_assert!(splice.range.start >= cursor, "overlapping splices");
        out.push_str(&src[cursor..splice.range.start]);
        out.push_str(&splice.text);
        cursor = splice.range.end;
    }
    out.push_str(&src[cursor..]);
    out
}

/// Splices that remove the `remove` keys and append the `add` pairs not
/// already present. Both are annotation keys; values are raw strings.
///
/// Existing entries keep their position and their exact text. New pairs go
/// after the last existing entry, in the order given. If nothing would be
/// left, the whole `annotations` key goes.
pub(crate) fn patch(
    src: &str,
    resource: &Resource<'_>,
    add: &[(String, String)],
    remove: &[String],
) -> Result<Vec<Splice>> {
    let nl = if src.contains("\r\n") { "\r\n" } else { "\n" };
    let step = indent_step(resource);

    let Some(block) = resource.annotations() else {
        return Ok(new_block(src, resource, add, step, nl));
    };
    if !block.has_block(src) {
        return fill_empty_block(src, block, add, step, nl);
    }

    let entries = scan::mapping(src, block.children)?;
    let present: HashSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    let dropped: Vec<&Entry<'_>> = entries.iter().filter(|e| remove.contains(&e.key)).collect();
    let appended: Vec<&(String, String)> = add
        .iter()
        .filter(|(key, _)| !present.contains(key.as_str()))
        .collect();

    tracing::debug!(
        existing = entries.len(),
        removed = dropped.len(),
        added = appended.len(),
        "patching annotations"
    );

    if dropped.is_empty() && appended.is_empty() {
        return Ok(Vec::new());
    }
    if dropped.len() == entries.len() && appended.is_empty() {
        return Ok(vec![Splice::delete(block.span.clone())]);
    }

    let mut splices: Vec<Splice> = dropped
        .iter()
        .map(|e| Splice::delete(e.span.clone()))
        .collect();
    if let Some(last) = entries.last().filter(|_| !appended.is_empty()) {
        // A dropped last entry may own the end of the file.
        let at = if remove.contains(&last.key) {
            last.span.start
        } else {
            last.span.end
        };
        let lines = pairs(last.line.indent(), appended);
        splices.push(Splice::insert(at, join_lines(src, at, lines, nl)));
    }
    Ok(splices)
}

/// Policy annotations currently set on `resource`, decoded.
pub(crate) fn policies(src: &str, resource: &Resource<'_>) -> Result<Set> {
    let mut set = Set::new();
    let Some(block) = resource.annotations() else {
        return Ok(set);
    };
    if !block.has_block(src) {
        check_empty_marker(src, block)?;
        return Ok(set);
    }
    for entry in scan::mapping(src, block.children)? {
        if let Some(policy) = Policy::from_annotation(&entry.key) {
            let value = decode(src, &entry)?;
            set.insert(policy, value);
        }
    }
    Ok(set)
}

// Indentation the document uses per nesting level, taken from `metadata`.
fn indent_step(resource: &Resource<'_>) -> usize {
    resource
        .meta
        .first()
        .map(|e| e.line.indent().saturating_sub(resource.metadata.line.indent()))
        .filter(|step| *step > 0)
        .unwrap_or(2)
}

fn new_block(
    src: &str,
    resource: &Resource<'_>,
    add: &[(String, String)],
    step: usize,
    nl: &str,
) -> Vec<Splice> {
    let Some(last) = resource.meta.last().filter(|_| !add.is_empty()) else {
        return Vec::new();
    };
    let indent = last.line.indent();
    let mut lines = vec![format!("{:indent$}annotations:", "")];
    lines.extend(pairs(indent + step, add));
    let at = last.span.end;
    vec![Splice::insert(at, join_lines(src, at, lines, nl))]
}

// `annotations:` with no entries, `annotations: {}` or `annotations: null`.
fn fill_empty_block(
    src: &str,
    block: &Entry<'_>,
    add: &[(String, String)],
    step: usize,
    nl: &str,
) -> Result<Vec<Splice>> {
    check_empty_marker(src, block)?;
    if add.is_empty() {
        return Ok(vec![Splice::delete(block.span.clone())]);
    }

    let mut splices = Vec::new();
    let marker = block.inline(src);
    if !marker.is_empty() {
        let raw = &src[block.value_start..block.line.end];
        if let Some(offset) = raw.find(marker) {
            let end = block.value_start + offset + marker.len();
            splices.push(Splice::delete(block.value_start..end));
        }
    }
    let at = block.span.end;
    let lines = pairs(block.line.indent() + step, add);
    splices.push(Splice::insert(at, join_lines(src, at, lines, nl)));
    Ok(splices)
}

fn check_empty_marker(src: &str, block: &Entry<'_>) -> Result<()> {
    match block.inline(src) {
        "" | "{}" | "~" | "null" | "Null" | "NULL" => Ok(()),
        _ => Err(Error::malformed(
            src,
            block.line.start,
            "annotations must be a block mapping",
        )),
    }
}

fn pairs<'p>(indent: usize, pairs: impl IntoIterator<Item = &'p (String, String)>) -> Vec<String> {
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{:indent$}{}: {}",
                "",
                scalar::render(key),
                scalar::render(value)
            )
        })
        .collect()
}

// Lines inserted at the very end of a file without a final line break go
// after a new break, and do not add one of their own.
fn join_lines(src: &str, at: usize, lines: Vec<String>, nl: &str) -> String {
    if at == src.len() && !src.is_empty() && !src.ends_with('\n') {
        return format!("{nl}{}", lines.join(nl));
    }
    let mut text = lines.join(nl);
    text.push_str(nl);
    text
}

fn decode(src: &str, entry: &Entry<'_>) -> Result<String> {
    use serde_yaml::Value;

    let raw = &src[entry.value_start..entry.span.end];
    let value: Value = serde_yaml::from_str(raw).map_err(|err| {
        Error::malformed(
            src,
            entry.line.start,
            format!("cannot read value of {}: {err}", entry.key),
        )
    })?;
    match value {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(Error::malformed(
            src,
            entry.line.start,
            format!("value of {} is not a scalar", entry.key),
        )),
    }
}
