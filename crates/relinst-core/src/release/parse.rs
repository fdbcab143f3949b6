//! Best-effort `tag_name` extraction from a release metadata body.
//!
//! The metadata endpoint is unauthenticated and rate limited, and its body is
//! not guaranteed to be complete JSON, so this scans for the field instead of
//! deserializing the document.

const FIELD: &str = "\"tag_name\"";

/// Returns the first `"tag_name": "<value>"` string value in `body`.
pub fn parse_release_tag(body: &str) -> Option<String> {
    let mut search = body;
    while let Some(pos) = search.find(FIELD) {
        let after = &search[pos + FIELD.len()..];
        if let Some(tag) = string_value(after) {
            if !tag.is_empty() {
                return Some(tag);
            }
        }
        search = after;
    }
    None
}

/// Parses `\s* : \s* "value"` at the start of `s`.
fn string_value(s: &str) -> Option<String> {
    let s = s.trim_start().strip_prefix(':')?.trim_start();
    let s = s.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(out.trim().to_string()),
            '\\' => match chars.next()? {
                'n' | 'r' | 't' => out.push(' '),
                other => out.push(other),
            },
            c => out.push(c),
        }
    }
    None
}
