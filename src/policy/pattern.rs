//! Tag filter patterns.
//!
//! A filter value is `glob:<pattern>`, `semver:<range>`, `regexp:<pattern>`
//! (`regex:` is accepted too) or a bare pattern, which is a glob. Globs are
//! always valid; semver ranges and regular expressions must compile.
//!
//! Semver ranges take the constraint syntax manifests are written in:
//! comparators separated by commas or spaces (`>=1.0 <2.0`), hyphen ranges
//! (`1.2 - 1.4`) and alternatives joined by `||`.

use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;
use thiserror::Error;

const GLOB_PREFIX: &str = "glob:";
const SEMVER_PREFIX: &str = "semver:";
const REGEXP_PREFIX: &str = "regexp:";
const REGEXP_ALT_PREFIX: &str = "regex:";

/// The match-everything filter. Setting it is the same as having no filter.
pub const PATTERN_ALL: &str = "glob:*";

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid semver range {range:?}: {source}")]
    Semver {
        range: String,
        #[source]
        source: semver::Error,
    },

    #[error("invalid regular expression {pattern:?}: {source}")]
    Regexp {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Glob(String),
    Semver { range: String, reqs: Vec<VersionReq> },
    Regexp(Regex),
}

impl Pattern {
    /// Parse and validate a filter value. The prefix selects the validator.
    pub fn new(value: &str) -> Result<Self, PatternError> {
        if let Some(range) = value.strip_prefix(SEMVER_PREFIX) {
            return semver_range(range).map(|reqs| Pattern::Semver {
                range: range.to_string(),
                reqs,
            });
        }
        if let Some(pattern) = value
            .strip_prefix(REGEXP_PREFIX)
            .or_else(|| value.strip_prefix(REGEXP_ALT_PREFIX))
        {
            return regexp(pattern).map(Pattern::Regexp);
        }
        let pattern = value.strip_prefix(GLOB_PREFIX).unwrap_or(value);
        glob(pattern).map(|()| Pattern::Glob(pattern.to_string()))
    }

    /// Whether `tag` passes this filter.
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            Pattern::Glob(pattern) => match ::glob::Pattern::new(pattern) {
                Ok(compiled) => compiled.matches(tag),
                Err(_) => pattern == tag,
            },
            Pattern::Semver { reqs, .. } => {
                lenient_version(tag).is_some_and(|v| reqs.iter().any(|req| req.matches(&v)))
            }
            Pattern::Regexp(re) => re.is_match(tag),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Glob(pattern) => write!(f, "{GLOB_PREFIX}{pattern}"),
            Pattern::Semver { range, .. } => write!(f, "{SEMVER_PREFIX}{range}"),
            Pattern::Regexp(re) => write!(f, "{REGEXP_PREFIX}{}", re.as_str()),
        }
    }
}

/// Globs have no constraint language to violate.
pub fn glob(_pattern: &str) -> Result<(), PatternError> {
    Ok(())
}

/// Parse a range into its `||` alternatives. Every alternative must parse.
pub fn semver_range(range: &str) -> Result<Vec<VersionReq>, PatternError> {
    range
        .split("||")
        .map(|alternative| {
            VersionReq::parse(&comparators(alternative)).map_err(|source| PatternError::Semver {
                range: range.to_string(),
                source,
            })
        })
        .collect()
}

// Rewrite one alternative into the comma-separated form `VersionReq` reads.
fn comparators(alternative: &str) -> String {
    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(">={}, <={}", low.trim(), high.trim());
    }
    let mut out: Vec<String> = Vec::new();
    let mut operator = String::new();
    for token in alternative
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| matches!(c, '=' | '<' | '>' | '~' | '^')) {
            operator.push_str(token);
            continue;
        }
        out.push(format!("{}{token}", std::mem::take(&mut operator)));
    }
    if !operator.is_empty() {
        out.push(operator);
    }
    out.join(", ")
}

pub fn regexp(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|source| PatternError::Regexp {
        pattern: pattern.to_string(),
        source,
    })
}

// Image tags are often `v1.2` or `1.2`; pad them out to a full version.
fn lenient_version(tag: &str) -> Option<Version> {
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    if let Ok(version) = Version::parse(tag) {
        return Some(version);
    }
    let (core, rest) = match tag.find(['-', '+']) {
        Some(i) => tag.split_at(i),
        None => (tag, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}
