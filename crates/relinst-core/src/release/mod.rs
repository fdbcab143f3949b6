//! Release resolution: turn `latest`, `1.2.3` or `v1.2.3` into the canonical
//! tag reported by the hosting platform, and build release URLs.

mod parse;

pub use parse::parse_release_tag;

use crate::config::ProjectConfig;
use crate::error::Error;
use crate::fetch::Fetch;
use anyhow::{anyhow, Context, Result};
use url::Url;

/// Requested version meaning "newest release".
pub const LATEST: &str = "latest";

/// Leading character stripped/re-added to tolerate `1.2.3` vs `v1.2.3`.
pub const TAG_PREFIX: char = 'v';

/// Tags to query for a requested version, prefixed form first.
pub fn tag_candidates(requested: &str) -> Vec<String> {
    let bare = requested.strip_prefix(TAG_PREFIX).unwrap_or(requested);
    let prefixed = format!("{}{}", TAG_PREFIX, bare);
    if bare.is_empty() || prefixed == bare {
        return vec![requested.to_string()];
    }
    vec![prefixed, bare.to_string()]
}

/// Appends path segments to `base`, percent-encoding each one.
fn join_segments(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("invalid base URL {}", base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL {} cannot take a path", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

/// Metadata endpoint for `tag`, or the latest release when `None`.
pub fn release_url(config: &ProjectConfig, tag: Option<&str>) -> Result<String> {
    let owner = config.owner.as_str();
    let repo = config.repo.as_str();
    match tag {
        Some(tag) => join_segments(
            &config.api_url,
            &["repos", owner, repo, "releases", "tags", tag],
        ),
        None => join_segments(&config.api_url, &["repos", owner, repo, "releases", "latest"]),
    }
}

/// Download URL of one file attached to release `tag`.
pub fn asset_url(config: &ProjectConfig, tag: &str, filename: &str) -> Result<String> {
    join_segments(
        &config.download_url,
        &[
            config.owner.as_str(),
            config.repo.as_str(),
            "releases",
            "download",
            tag,
            filename,
        ],
    )
}

/// `Authorization` header for metadata requests, when a token is configured.
pub fn auth_header(config: &ProjectConfig) -> Option<String> {
    config
        .github_token
        .as_ref()
        .map(|t| format!("Authorization: Bearer {}", t))
}

/// Resolves `requested` to a canonical tag.
///
/// `latest` (or an empty request) queries the latest-release endpoint once;
/// anything else tries the prefixed then the bare form and stops at the first
/// response carrying a `tag_name`.
pub fn resolve(fetcher: &dyn Fetch, config: &ProjectConfig, requested: &str) -> Result<String> {
    let requested = requested.trim();
    let header = auth_header(config);
    let lookups: Vec<Option<String>> = if requested.is_empty() || requested == LATEST {
        vec![None]
    } else {
        tag_candidates(requested).into_iter().map(Some).collect()
    };

    let mut tried = Vec::new();
    for lookup in lookups {
        let url = release_url(config, lookup.as_deref())?;
        tracing::debug!("resolving release via {}", url);
        tried.push(url.clone());
        let Some(body) = fetcher.fetch(&url, header.as_deref()) else {
            continue;
        };
        match parse_release_tag(&String::from_utf8_lossy(&body)) {
            Some(tag) => {
                tracing::info!(
                    "resolved {} {} -> {}",
                    config.owner_repo(),
                    requested_label(requested),
                    tag
                );
                return Ok(tag);
            }
            None => tracing::debug!("no tag_name in response from {}", url),
        }
    }

    Err(Error::Resolution {
        repo: config.owner_repo(),
        requested: requested_label(requested).to_string(),
        tried,
    }
    .into())
}

fn requested_label(requested: &str) -> &str {
    if requested.is_empty() {
        LATEST
    } else {
        requested
    }
}
