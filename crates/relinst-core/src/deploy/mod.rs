//! Deployment driver: install a verified binary, or launch it from cache.
//!
//! Both paths run platform check → tag resolution → asset naming → download
//! → verify → unpack. Install works in a scratch directory and copies the
//! result into the configured bin directory; launch keeps everything in a
//! cache slot and replaces the current process with the cached executable.

mod exec;
mod pipeline;

pub use exec::exec_tool;

use crate::asset::AssetDescriptor;
use crate::cache::{self, CacheSlot, SlotState};
use crate::checksum::{self, ChecksumMode};
use crate::config::ProjectConfig;
use crate::error::{Error, VerifyError};
use crate::fetch::Fetch;
use crate::platform::{self, Platform};
use crate::release;
use anyhow::{Context, Result};
use pipeline::{place_executable, Pipeline};
use std::convert::Infallible;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

/// A resolved release: canonical tag plus the asset expected for this platform.
#[derive(Debug, Clone)]
pub struct Release {
    pub tag: String,
    pub asset: AssetDescriptor,
}

/// Result of a successful install.
#[derive(Debug, Clone)]
pub struct Installed {
    pub path: PathBuf,
    pub tag: String,
    /// SHA-256 of the verified release asset.
    pub asset_digest: String,
    /// SHA-256 of the installed executable.
    pub digest: String,
}

pub struct Deployer<'a> {
    config: &'a ProjectConfig,
    fetcher: &'a dyn Fetch,
    platform: Platform,
}

fn is_verification_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Error>()
        .is_some_and(Error::is_verification)
}

impl<'a> Deployer<'a> {
    /// Fails with a configuration error, before any network access, when
    /// `platform` is not allow-listed.
    pub fn new(config: &'a ProjectConfig, fetcher: &'a dyn Fetch, platform: Platform) -> Result<Self> {
        platform::ensure_supported(&platform, &config.platforms)?;
        Ok(Self {
            config,
            fetcher,
            platform,
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn resolve(&self, requested: &str) -> Result<Release> {
        let tag = release::resolve(self.fetcher, self.config, requested)
            .with_context(|| format!("resolve release for platform {}", self.platform))?;
        let asset = AssetDescriptor::new(self.config, &tag, &self.platform);
        tracing::debug!(
            "asset {} for {} (checksum candidates: {})",
            asset.filename,
            self.platform,
            asset.candidate_names().join(", ")
        );
        Ok(Release { tag, asset })
    }

    fn pipeline<'p>(&'p self, release: &'p Release) -> Pipeline<'p> {
        Pipeline {
            config: self.config,
            fetcher: self.fetcher,
            platform: &self.platform,
            tag: &release.tag,
            asset: &release.asset,
        }
    }

    pub fn slot(&self, release: &Release) -> CacheSlot {
        let dir = cache::slot_path(
            &self.config.cache_dir,
            &self.config.owner,
            &self.config.repo,
            &release.tag,
            &self.platform,
        );
        CacheSlot::new(dir, &release.asset, &self.config.binary)
    }

    /// Downloads, verifies and copies the executable into the bin directory.
    /// Nothing is written under the final name unless every step succeeded.
    pub fn install(&self, requested: &str) -> Result<Installed> {
        let release = self.resolve(requested)?;
        let steps = self.pipeline(&release);
        let scratch = tempfile::Builder::new()
            .prefix("relinst-")
            .tempdir()
            .context("create scratch directory")?;

        let asset = steps.download_asset(scratch.path())?;
        let (source, mode) = steps.download_checksum(scratch.path())?;
        let asset_digest = steps.verify(&asset, &source, mode)?;

        let staged = scratch.path().join("bin").join(&self.config.binary);
        steps.materialize(&asset, &scratch.path().join("unpack"), &staged)?;

        fs::create_dir_all(&self.config.bin_dir)
            .with_context(|| format!("create {}", self.config.bin_dir.display()))?;
        let dest = self.config.bin_dir.join(&self.config.binary);
        place_executable(&staged, &dest)?;

        let expected = checksum::sha256_path(&staged)?;
        let digest = checksum::sha256_path(&dest)?;
        if digest != expected {
            let _ = fs::remove_file(&dest);
            return Err(Error::Verification {
                asset: dest.display().to_string(),
                source: VerifyError::Mismatch {
                    expected,
                    actual: digest,
                },
            }
            .into());
        }
        tracing::info!("installed {} {} to {}", self.config.binary, release.tag, dest.display());
        Ok(Installed {
            path: dest,
            tag: release.tag,
            asset_digest,
            digest,
        })
    }

    /// An already extracted slot for `requested`, found without any network
    /// access. Only explicit tags can hit; `latest` must always be resolved.
    fn cached_executable(&self, requested: &str) -> Option<PathBuf> {
        let requested = requested.trim();
        if requested.is_empty() || requested == release::LATEST {
            return None;
        }
        release::tag_candidates(requested).into_iter().find_map(|tag| {
            let dir = cache::slot_path(
                &self.config.cache_dir,
                &self.config.owner,
                &self.config.repo,
                &tag,
                &self.platform,
            );
            let exe = dir.join("bin").join(&self.config.binary);
            cache::is_executable(&exe).then_some(exe)
        })
    }

    /// Returns the cached executable for `requested`, populating the slot if
    /// needed. A stale cached asset that fails verification is discarded and
    /// the download/verify/extract sequence re-runs exactly once.
    ///
    /// With `verify_cache`, an extracted slot is re-verified against its
    /// cached asset before use.
    pub fn prepare_launch(&self, requested: &str, verify_cache: bool) -> Result<PathBuf> {
        if !verify_cache {
            if let Some(exe) = self.cached_executable(requested) {
                tracing::debug!("using cached {}", exe.display());
                return Ok(exe);
            }
        }

        let release = self.resolve(requested)?;
        let slot = self.slot(&release);
        let state = slot.state(&release.asset);
        tracing::debug!("cache slot {} is {:?}", slot.dir().display(), state);

        let first = match state {
            SlotState::Extracted if !verify_cache => {
                tracing::debug!("using cached {}", slot.executable_path().display());
                return Ok(slot.executable_path());
            }
            SlotState::Extracted => self.recheck(&release, &slot),
            SlotState::Downloaded => self.populate(&release, &slot, true),
            SlotState::Empty | SlotState::Verified => self.populate(&release, &slot, false),
        };

        match first {
            Ok(exe) => Ok(exe),
            Err(e) if state != SlotState::Empty && is_verification_failure(&e) => {
                tracing::warn!(
                    "cached {} failed verification ({:#}); downloading again",
                    release.asset.filename,
                    e
                );
                slot.invalidate()?;
                self.populate(&release, &slot, false)
            }
            Err(e) => Err(e),
        }
    }

    /// Prepares the executable and replaces the current process with it.
    pub fn launch(&self, requested: &str, args: &[OsString], verify_cache: bool) -> Result<Infallible> {
        let exe = self.prepare_launch(requested, verify_cache)?;
        exec_tool(&exe, args)
    }

    /// Re-verifies an extracted slot against the asset and checksum it holds.
    fn recheck(&self, release: &Release, slot: &CacheSlot) -> Result<PathBuf> {
        let asset = slot.asset_path();
        let (source, mode) = match slot.cached_checksum(&release.asset) {
            Some(found) if asset.is_file() => found,
            _ => {
                return Err(Error::Verification {
                    asset: release.asset.filename.clone(),
                    source: VerifyError::MissingEntry {
                        asset: release.asset.filename.clone(),
                        source_name: slot.dir().display().to_string(),
                    },
                }
                .into())
            }
        };
        self.pipeline(release).verify(&asset, &source, mode)?;
        Ok(slot.executable_path())
    }

    /// Runs download (unless `reuse` and the slot already holds the asset
    /// and a checksum source) → verify → extract into `slot`.
    fn populate(&self, release: &Release, slot: &CacheSlot, reuse: bool) -> Result<PathBuf> {
        let steps = self.pipeline(release);
        slot.ensure_dir()?;

        let cached = if reuse {
            slot.cached_checksum(&release.asset)
                .filter(|_| slot.asset_path().is_file())
        } else {
            None
        };
        let mut state = SlotState::Empty;
        let (asset, (source, mode)): (PathBuf, (PathBuf, ChecksumMode)) = match cached {
            Some(found) => (slot.asset_path(), found),
            None => {
                let asset = steps.download_asset(slot.dir())?;
                (asset, steps.download_checksum(slot.dir())?)
            }
        };
        state = advance(slot, state);

        steps.verify(&asset, &source, mode)?;
        state = advance(slot, state);

        let exe = slot.executable_path();
        steps.materialize(&asset, &slot.unpack_dir(), &exe)?;
        advance(slot, state);
        tracing::debug!("cached {} {} at {}", self.config.binary, release.tag, exe.display());
        Ok(exe)
    }
}

fn advance(slot: &CacheSlot, state: SlotState) -> SlotState {
    let next = state.next().unwrap_or(state);
    tracing::debug!("cache slot {}: {:?} -> {:?}", slot.dir().display(), state, next);
    next
}
