//! Scalar helpers: reading inline values and rendering new ones.

/// Text before an inline comment. A `#` only starts a comment at the start of
/// the value or after whitespace.
pub(crate) fn strip_comment(text: &str) -> &str {
    if text.trim_start().starts_with('#') {
        return "";
    }
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate().skip(1) {
        if *b == b'#' && matches!(bytes[i - 1], b' ' | b'\t') {
            return &text[..i];
        }
    }
    text
}

/// Read a quoted scalar at the start of `text`, returning its value and the
/// number of bytes consumed including both quotes.
pub(crate) fn unquote_prefix(text: &str) -> Option<(String, usize)> {
    let mut chars = text.char_indices();
    let (_, quote) = chars.next()?;
    let mut out = String::new();
    match quote {
        '\'' => {
            while let Some((i, c)) = chars.next() {
                if c != '\'' {
                    out.push(c);
                    continue;
                }
                if text[i + 1..].starts_with('\'') {
                    out.push('\'');
                    chars.next();
                    continue;
                }
                return Some((out, i + 1));
            }
            None
        }
        '"' => {
            while let Some((i, c)) = chars.next() {
                match c {
                    '"' => return Some((out, i + 1)),
                    '\\' => {
                        let (_, escaped) = chars.next()?;
                        out.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        });
                    }
                    other => out.push(other),
                }
            }
            None
        }
        _ => None,
    }
}

/// Value of a single-line scalar such as `nginx`, `'nginx' # web` or `"ns"`.
pub(crate) fn inline(text: &str) -> String {
    let text = text.trim_start();
    if text.starts_with(['\'', '"']) {
        if let Some((value, _)) = unquote_prefix(text) {
            return value;
        }
    }
    strip_comment(text).trim().to_string()
}

/// Render `value` as a YAML scalar that reads back as the same string.
pub(crate) fn render(value: &str) -> String {
    if value.chars().any(|c| c.is_control() && c != '\t') {
        return double_quoted(value);
    }
    if needs_quotes(value) {
        return format!("'{}'", value.replace('\'', "''"));
    }
    value.to_string()
}

fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

const INDICATORS: &[char] = &[
    '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.trim() != value
        || value.starts_with(INDICATORS)
        || value.ends_with(':')
        || value.contains(": ")
        || value.contains(" #")
        || value.contains('\t')
        || resolves_to_non_string(value)
}

// Plain scalars that a YAML 1.1 reader would turn into bools, nulls or numbers.
fn resolves_to_non_string(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "y" | "n" | "null" | "~"
    ) {
        return true;
    }
    if lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b") {
        return true;
    }
    if matches!(lower.as_str(), ".inf" | "+.inf" | "-.inf" | ".nan") {
        return true;
    }
    let numeric = lower.trim_start_matches(['+', '-']);
    !numeric.is_empty()
        && numeric.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && numeric
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '_' | ':' | 'e' | '+' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("true", "'true'")]
    #[case("False", "'False'")]
    #[case("null", "'null'")]
    #[case("1", "'1'")]
    #[case("1.5", "'1.5'")]
    #[case("1e3", "'1e3'")]
    #[case("", "''")]
    #[case("glob:*", "glob:*")]
    #[case("semver:*", "semver:*")]
    #[case("regexp:(.*?)", "regexp:(.*?)")]
    #[case("foo", "foo")]
    #[case("*", "'*'")]
    #[case("it's: here", "'it''s: here'")]
    #[case(" padded", "' padded'")]
    #[case("first\nsecond", "\"first\\nsecond\"")]
    #[case("v1.2.3", "v1.2.3")]
    fn renders_scalars(#[case] value: &str, #[case] rendered: &str) {
        assert_eq!(render(value), rendered);
    }

    #[rstest]
    #[case("true")]
    #[case("glob:*")]
    #[case("regexp:^v[0-9]+$")]
    #[case("it's # not a comment")]
    #[case("line one\nline \"two\"")]
    #[case("0x1f")]
    #[case("- dash")]
    fn rendered_scalars_read_back_unchanged(#[case] value: &str) {
        let doc = format!("key: {}\n", render(value));
        let parsed: std::collections::BTreeMap<String, String> =
            serde_yaml::from_str(&doc).expect("valid yaml");
        assert_eq!(parsed["key"], value);
    }

    #[rstest]
    #[case(" nginx", "nginx")]
    #[case("nginx   # trailing comment", "nginx")]
    #[case(" 'quoted # value' # comment", "quoted # value")]
    #[case(" \"double \\\"q\\\"\"", "double \"q\"")]
    #[case(" 'it''s'", "it's")]
    #[case(" # only a comment", "")]
    #[case("", "")]
    #[case(" a#b", "a#b")]
    fn reads_inline_scalars(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(inline(text), expected);
    }

    #[test]
    fn unterminated_quotes_are_not_read() {
        assert_eq!(unquote_prefix("'open"), None);
        assert_eq!(unquote_prefix("\"open\\\""), None);
    }
}
