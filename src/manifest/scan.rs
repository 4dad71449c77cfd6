//! Indentation-aware line scanner.
//!
//! This is not a YAML parser. It splits a manifest into documents and lines,
//! and reads block mappings and sequences just far enough to find keys and the
//! byte spans they own. Values are never interpreted here.

use crate::error::{Error, Result};
use crate::manifest::scalar;
use std::ops::Range;

/// One line of the manifest, as byte offsets into the source.
///
/// `content` is the first non-blank byte; for the first line of a sequence
/// item it points past the `- ` marker, so the item's keys line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line {
    pub start: usize,
    pub content: usize,
    pub end: usize,
    pub next: usize,
}

impl Line {
    pub fn indent(&self) -> usize {
        self.content - self.start
    }

    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        &src[self.content..self.end]
    }

    pub fn is_blank(&self) -> bool {
        self.content == self.end
    }

    pub fn is_trivia(&self, src: &str) -> bool {
        self.is_blank() || self.text(src).starts_with('#')
    }

    fn is_seq_item(&self, src: &str) -> bool {
        let text = self.text(src);
        text == "-" || text.starts_with("- ")
    }
}

pub(crate) fn lines(src: &str) -> Vec<Line> {
    let mut out = Vec::new();
    // A byte order mark belongs to no line, so splices never touch it.
    let mut start = if src.starts_with(BOM) { BOM.len_utf8() } else { 0 };
    while start < src.len() {
        let (end, next) = match src[start..].find('\n') {
            Some(i) => (start + i, start + i + 1),
            None => (src.len(), src.len()),
        };
        let end = if src[start..end].ends_with('\r') { end - 1 } else { end };
        let line = &src[start..end];
        let content = end - line.trim_start_matches([' ', '\t']).len();
        out.push(Line {
            start,
            content,
            end,
            next,
        });
        start = next;
    }
    out
}

const BOM: char = '\u{feff}';

/// Split into documents on `---` (and `...`) markers. Documents holding only
/// blank lines and comments are dropped.
pub(crate) fn documents(src: &str) -> Vec<Vec<Line>> {
    let mut docs = Vec::new();
    let mut current = Vec::new();
    for line in lines(src) {
        if line.indent() == 0 && is_marker(line.text(src)) {
            docs.push(std::mem::take(&mut current));
            continue;
        }
        current.push(line);
    }
    docs.push(current);
    docs.retain(|doc| doc.iter().any(|l| !l.is_trivia(src)));
    docs
}

fn is_marker(text: &str) -> bool {
    text == "..." || text == "---" || text.starts_with("--- ") || text.starts_with("---\t")
}

/// A key in a block mapping together with everything nested under it.
#[derive(Debug, Clone)]
pub(crate) struct Entry<'a> {
    pub key: String,
    pub line: Line,
    /// Byte offset just past the `:` on the key line.
    pub value_start: usize,
    pub children: &'a [Line],
    /// Key line through the last nested line, including its line break.
    /// Trailing blank lines and shallower comments are not part of it.
    pub span: Range<usize>,
}

impl Entry<'_> {
    /// Inline text after the colon, without any comment.
    pub fn inline<'s>(&self, src: &'s str) -> &'s str {
        scalar::strip_comment(&src[self.value_start..self.line.end]).trim()
    }

    /// Inline value read as a single-line scalar.
    pub fn scalar(&self, src: &str) -> String {
        scalar::inline(&src[self.value_start..self.line.end])
    }

    /// Whether anything other than blank lines and comments is nested here.
    pub fn has_block(&self, src: &str) -> bool {
        self.children.iter().any(|l| !l.is_trivia(src))
    }
}

pub(crate) fn find<'e, 'a>(entries: &'e [Entry<'a>], key: &str) -> Option<&'e Entry<'a>> {
    entries.iter().find(|e| e.key == key)
}

/// Read `lines` as a block mapping.
///
/// All keys must share the indentation of the first one. A key owns every
/// following line that is indented deeper, plus sequence items at its own
/// indentation (`key:\n- item` is a common compact style).
pub(crate) fn mapping<'a>(src: &str, lines: &'a [Line]) -> Result<Vec<Entry<'a>>> {
    let mut entries = Vec::new();
    let Some(first) = lines.iter().position(|l| !l.is_trivia(src)) else {
        return Ok(entries);
    };
    let indent = lines[first].indent();

    let mut i = first;
    while i < lines.len() {
        let line = lines[i];
        if line.is_trivia(src) {
            i += 1;
            continue;
        }
        check_indentation(src, &line)?;
        if line.indent() != indent {
            return Err(Error::malformed(
                src,
                line.start,
                format!(
                    "inconsistent indentation: expected {indent} spaces, found {}",
                    line.indent()
                ),
            ));
        }
        let (key, value_start) = parse_key(src, &line)?;

        let mut last = i;
        for (j, child) in lines.iter().enumerate().skip(i + 1) {
            if child.is_blank() {
                continue;
            }
            let nested = child.indent() > indent;
            if child.is_trivia(src) {
                if nested {
                    last = j;
                }
                continue;
            }
            if nested || (child.indent() == indent && child.is_seq_item(src)) {
                last = j;
            } else {
                break;
            }
        }

        // Trailing blank lines are part of a keep-chomped block scalar.
        let mut end = lines[last].next;
        if keeps_trailing_lines(&src[value_start..line.end]) {
            end = skip_blank_lines(src, end);
        }

        entries.push(Entry {
            key,
            line,
            value_start,
            children: &lines[i + 1..last + 1],
            span: line.start..end,
        });
        i = last + 1;
    }
    Ok(entries)
}

// `|+`, `>+`, `|2+`, `>+1`: a block scalar header with keep chomping.
fn keeps_trailing_lines(value: &str) -> bool {
    let header = scalar::strip_comment(value).trim();
    let Some(indicators) = header.strip_prefix(['|', '>']) else {
        return false;
    };
    indicators.contains('+') && indicators.chars().all(|c| c == '+' || c.is_ascii_digit())
}

fn skip_blank_lines(src: &str, mut offset: usize) -> usize {
    while offset < src.len() {
        let end = src[offset..].find('\n').map_or(src.len(), |i| offset + i + 1);
        if !src[offset..end].trim().is_empty() {
            break;
        }
        offset = end;
    }
    offset
}

/// Read `lines` as a block sequence, returning the lines of each item. The
/// first line of an item is re-based past its `- ` marker.
pub(crate) fn sequence_items(src: &str, lines: &[Line]) -> Result<Vec<Vec<Line>>> {
    let mut items: Vec<Vec<Line>> = Vec::new();
    let Some(indent) = lines.iter().find(|l| !l.is_trivia(src)).map(Line::indent) else {
        return Ok(items);
    };

    for line in lines {
        if line.is_trivia(src) {
            if let Some(item) = items.last_mut() {
                item.push(*line);
            }
            continue;
        }
        check_indentation(src, line)?;
        if line.indent() == indent && line.is_seq_item(src) {
            let rest = &line.text(src)[1..];
            let content = line.content + 1 + (rest.len() - rest.trim_start_matches(' ').len());
            let mut item = Vec::new();
            if content < line.end {
                item.push(Line { content, ..*line });
            }
            items.push(item);
            continue;
        }
        match items.last_mut() {
            Some(item) if line.indent() > indent => item.push(*line),
            _ => return Err(Error::malformed(src, line.start, "expected a sequence item")),
        }
    }
    Ok(items)
}

fn check_indentation(src: &str, line: &Line) -> Result<()> {
    if src[line.start..line.content].contains('\t') {
        return Err(Error::malformed(src, line.start, "tab character in indentation"));
    }
    Ok(())
}

/// Split a key line into its key and the offset just past the colon.
fn parse_key(src: &str, line: &Line) -> Result<(String, usize)> {
    let text = line.text(src);
    let malformed = |reason: &str| Error::malformed(src, line.start, reason);

    let (key, colon) = if text.starts_with(['\'', '"']) {
        let (key, consumed) =
            scalar::unquote_prefix(text).ok_or_else(|| malformed("unterminated quoted key"))?;
        let rest = &text[consumed..];
        let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        if !rest[gap..].starts_with(':') {
            return Err(malformed("expected ':' after quoted key"));
        }
        (key, consumed + gap)
    } else {
        if text == "-" || text.starts_with("- ") {
            return Err(malformed("expected a mapping key, found a sequence item"));
        }
        if text.starts_with(['{', '[', '?', '|', '>']) {
            return Err(malformed("expected a block mapping key"));
        }
        let colon = key_colon(text).ok_or_else(|| malformed("expected 'key: value'"))?;
        (text[..colon].trim_end().to_string(), colon)
    };

    if !text[colon + 1..].is_empty() && !text[colon + 1..].starts_with([' ', '\t']) {
        return Err(malformed("expected whitespace after ':'"));
    }
    if key.is_empty() {
        return Err(malformed("empty mapping key"));
    }
    Ok((key, line.content + colon + 1))
}

// First `:` that ends a plain key, i.e. is followed by whitespace or the end
// of the line. A comment before it means there is no key.
fn key_colon(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => return None,
            b':' if matches!(bytes.get(i + 1), None | Some(b' ' | b'\t')) => return Some(i),
            _ => {}
        }
    }
    None
}
