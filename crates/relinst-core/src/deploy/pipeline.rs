//! Download → verify → materialize steps shared by install and launch.

use crate::asset::AssetDescriptor;
use crate::cache::set_executable;
use crate::checksum::{self, ChecksumMode};
use crate::config::ProjectConfig;
use crate::error::Error;
use crate::fetch::{fetch_to_file, temp_path, Fetch};
use crate::platform::Platform;
use crate::release;
use crate::unpack::{locate_executable, unpack};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// The steps for one resolved release on one platform.
pub(crate) struct Pipeline<'a> {
    pub config: &'a ProjectConfig,
    pub fetcher: &'a dyn Fetch,
    pub platform: &'a Platform,
    pub tag: &'a str,
    pub asset: &'a AssetDescriptor,
}

impl Pipeline<'_> {
    fn download_error(&self, what: String, candidates: Vec<String>) -> Error {
        Error::Download {
            what,
            platform: self.platform.to_string(),
            tag: self.tag.to_string(),
            candidates,
        }
    }

    /// Fetches the asset into `dir`. Assets are fetched without the API token.
    pub fn download_asset(&self, dir: &Path) -> Result<PathBuf> {
        let url = release::asset_url(self.config, self.tag, &self.asset.filename)?;
        let dest = dir.join(&self.asset.filename);
        tracing::info!("downloading {}", url);
        if !fetch_to_file(self.fetcher, &url, None, &dest)? {
            return Err(self.download_error(format!("asset {}", url), Vec::new()).into());
        }
        Ok(dest)
    }

    /// Fetches the first checksum candidate that exists into `dir`.
    pub fn download_checksum(&self, dir: &Path) -> Result<(PathBuf, ChecksumMode)> {
        let mut tried = Vec::new();
        for candidate in &self.asset.checksum_candidates {
            let url = release::asset_url(self.config, self.tag, &candidate.name)?;
            tried.push(candidate.name.clone());
            let dest = dir.join(&candidate.name);
            if fetch_to_file(self.fetcher, &url, None, &dest)? {
                tracing::debug!("using checksum source {}", candidate.name);
                return Ok((dest, candidate.mode));
            }
            tracing::debug!("checksum candidate {} not found", candidate.name);
        }
        Err(self
            .download_error(format!("checksum for {}", self.asset.filename), tried)
            .into())
    }

    /// `{step} {asset} (tag, platform, checksum candidates)` for error context.
    fn describe(&self, step: &str) -> String {
        format!(
            "{} {} (tag {}, platform {}, checksum candidates: {})",
            step,
            self.asset.filename,
            self.tag,
            self.platform,
            self.asset.candidate_names().join(", ")
        )
    }

    pub fn verify(&self, asset: &Path, source: &Path, mode: ChecksumMode) -> Result<String> {
        checksum::verify(asset, source, &self.asset.filename, mode)
            .with_context(|| self.describe("verify"))
    }

    /// Produces an executable at `dest` from a verified asset, unpacking
    /// archives into `work_dir` first. `dest` appears only once complete.
    pub fn materialize(&self, asset: &Path, work_dir: &Path, dest: &Path) -> Result<()> {
        self.extract_to(asset, work_dir, dest)
            .with_context(|| self.describe("extract"))
    }

    fn extract_to(&self, asset: &Path, work_dir: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let source = if self.asset.format.is_archive() {
            if work_dir.exists() {
                fs::remove_dir_all(work_dir)
                    .with_context(|| format!("clear {}", work_dir.display()))?;
            }
            unpack(asset, self.asset.format, work_dir)?;
            locate_executable(work_dir, &self.config.binary, &self.config.project)?
        } else {
            asset.to_path_buf()
        };
        place_executable(&source, dest)?;
        if self.asset.format.is_archive() {
            if let Err(e) = fs::remove_dir_all(work_dir) {
                tracing::debug!("could not remove {}: {}", work_dir.display(), e);
            }
        }
        Ok(())
    }
}

/// Copies `source` to `dest` via a `.part` file, marking it executable before
/// the final rename.
pub(crate) fn place_executable(source: &Path, dest: &Path) -> Result<()> {
    let part = temp_path(dest);
    fs::copy(source, &part)
        .with_context(|| format!("copy {} -> {}", source.display(), part.display()))?;
    let placed = set_executable(&part).and_then(|()| {
        fs::rename(&part, dest)
            .with_context(|| format!("rename {} -> {}", part.display(), dest.display()))
    });
    if placed.is_err() {
        let _ = fs::remove_file(&part);
    }
    placed
}
