//! HTTP GET capability used for release metadata and asset downloads.
//!
//! Only an unambiguous HTTP 200 counts as found. A 404, any other status, a
//! redirect loop, or a transport error all come back as `None`: callers react
//! to each the same way, by trying the next candidate.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retrieves a URL, optionally sending one extra `Name: value` header.
pub trait Fetch {
    fn fetch(&self, url: &str, header: Option<&str>) -> Option<Vec<u8>>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn fetch(&self, url: &str, header: Option<&str>) -> Option<Vec<u8>> {
        (**self).fetch(url, header)
    }
}

/// libcurl-backed fetcher. Follows redirects.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    user_agent: String,
    connect_timeout: Duration,
    max_redirections: u32,
}

impl Default for CurlFetcher {
    fn default() -> Self {
        Self {
            user_agent: format!("relinst/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout: Duration::from_secs(30),
            max_redirections: 10,
        }
    }
}

impl CurlFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, url: &str, header: Option<&str>) -> Result<(u32, Vec<u8>)> {
        let mut body = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url).context("invalid URL")?;
        easy.follow_location(true)?;
        easy.max_redirections(self.max_redirections)?;
        easy.useragent(&self.user_agent)?;
        easy.connect_timeout(self.connect_timeout)?;

        if let Some(h) = header {
            let mut list = curl::easy::List::new();
            list.append(h.trim())?;
            easy.http_headers(list)?;
        }

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("GET request failed")?;
        }

        let code = easy.response_code().context("no response code")?;
        Ok((code, body))
    }
}

impl Fetch for CurlFetcher {
    fn fetch(&self, url: &str, header: Option<&str>) -> Option<Vec<u8>> {
        match self.get(url, header) {
            Ok((200, body)) => {
                tracing::debug!("GET {} -> 200 ({} bytes)", url, body.len());
                Some(body)
            }
            Ok((code, _)) => {
                tracing::debug!("GET {} -> HTTP {}", url, code);
                None
            }
            Err(e) => {
                tracing::debug!("GET {} failed: {:#}", url, e);
                None
            }
        }
    }
}

/// Path for the temp file: appends `.part` to the final path (e.g. `file.zip` → `file.zip.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}

/// Fetches `url` into `dest`. Returns `Ok(false)` when not found; the body is
/// written to a `.part` file first so `dest` only ever holds a complete body.
pub fn fetch_to_file(
    fetcher: &dyn Fetch,
    url: &str,
    header: Option<&str>,
    dest: &Path,
) -> Result<bool> {
    let Some(body) = fetcher.fetch(url, header) else {
        return Ok(false);
    };
    let part = temp_path(dest);
    fs::write(&part, &body).with_context(|| format!("write {}", part.display()))?;
    fs::rename(&part, dest)
        .with_context(|| format!("rename {} -> {}", part.display(), dest.display()))?;
    Ok(true)
}
