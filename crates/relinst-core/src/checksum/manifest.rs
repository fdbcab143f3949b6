//! Locate the digest for one asset inside a checksum source.

use super::ChecksumMode;

/// Returns the lowercase digest listed for `filename`.
///
/// A line matches when its last whitespace-separated token, with an optional
/// leading `*` (binary-mode marker) or `./` removed, equals `filename`; the
/// digest is that line's first token. In [`ChecksumMode::PerAsset`] a source
/// without a matching line falls back to the first token of its first
/// non-empty line.
pub fn extract_digest(text: &str, filename: &str, mode: ChecksumMode) -> Option<String> {
    let mut first_token: Option<&str> = None;
    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let Some(digest) = tokens.next() else {
            continue;
        };
        first_token.get_or_insert(digest);
        if let Some(name) = tokens.last() {
            let name = name.trim_start_matches('*');
            let name = name.strip_prefix("./").unwrap_or(name);
            if name == filename {
                return Some(digest.to_ascii_lowercase());
            }
        }
    }
    match mode {
        ChecksumMode::PerAsset => first_token.map(|d| d.to_ascii_lowercase()),
        ChecksumMode::Manifest => None,
    }
}
