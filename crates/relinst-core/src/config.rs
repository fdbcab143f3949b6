//! Project configuration.
//!
//! Built once at process entry from defaults, an optional
//! `~/.config/relinst/config.toml`, and `RELINST_*` environment variables,
//! then passed by reference to every component. Nothing below this module
//! reads the environment.

use crate::asset::ArchiveFormat;
use crate::checksum::ChecksumMode;
use crate::error::Error;
use crate::platform::Platform;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ASSET_TEMPLATE: &str = "{project}-{tag}-{os}-{arch}";
pub const DEFAULT_CHECKSUM_TEMPLATE: &str = "{asset}.sha256";
pub const DEFAULT_CHECKSUM_FALLBACKS: &[&str] = &["checksums.txt", "SHA256SUMS"];
pub const DEFAULT_PLATFORMS: &[&str] = &["linux/amd64", "linux/arm64", "darwin/amd64", "darwin/arm64"];
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://github.com";

/// Immutable, process-lifetime configuration for one project.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub owner: String,
    pub repo: String,
    /// Used in templates and executable lookup; defaults to `repo`.
    pub project: String,
    /// Installed executable name; defaults to `project`.
    pub binary: String,
    pub format: ArchiveFormat,
    pub asset_template: String,
    pub checksum_template: String,
    /// How the source named by `checksum_template` is read. Set to
    /// `Manifest` for templates like `{project}_{tag}_checksums.txt`.
    pub checksum_template_mode: ChecksumMode,
    /// Manifest filenames tried after the per-asset candidates, in order.
    pub checksum_fallbacks: Vec<String>,
    pub platforms: Vec<Platform>,
    pub cache_dir: PathBuf,
    pub bin_dir: PathBuf,
    /// Base of the release metadata API.
    pub api_url: String,
    /// Base of release asset downloads.
    pub download_url: String,
    pub github_token: Option<String>,
}

/// On-disk form; every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub project: Option<String>,
    pub binary: Option<String>,
    pub format: Option<String>,
    pub asset_template: Option<String>,
    pub checksum_template: Option<String>,
    pub checksum_template_mode: Option<String>,
    pub checksum_fallbacks: Option<Vec<String>>,
    pub platforms: Option<Vec<String>>,
    pub cache_dir: Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
    pub api_url: Option<String>,
    pub download_url: Option<String>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let file: ConfigFile =
            toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
        Ok(file)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn parse_platforms<S: AsRef<str>>(items: &[S]) -> Result<Vec<Platform>, Error> {
    items.iter().map(|s| s.as_ref().parse()).collect()
}

impl ProjectConfig {
    /// Built-in defaults for `owner/repo`. Paths are relative placeholders
    /// until [`ProjectConfig::load`] fills in the user's directories.
    pub fn for_repo(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            project: repo.to_string(),
            binary: repo.to_string(),
            format: ArchiveFormat::TarGz,
            asset_template: DEFAULT_ASSET_TEMPLATE.to_string(),
            checksum_template: DEFAULT_CHECKSUM_TEMPLATE.to_string(),
            checksum_template_mode: ChecksumMode::PerAsset,
            checksum_fallbacks: DEFAULT_CHECKSUM_FALLBACKS.iter().map(|s| s.to_string()).collect(),
            platforms: DEFAULT_PLATFORMS
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            cache_dir: PathBuf::from("relinst-cache"),
            bin_dir: PathBuf::from("bin"),
            api_url: DEFAULT_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            github_token: None,
        }
    }

    /// Loads the process configuration: defaults, then the config file (the
    /// given path, or the XDG one if present), then the environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(p) => ConfigFile::read(p)?,
            None => match default_config_path() {
                Some(p) => {
                    tracing::debug!("reading config {}", p.display());
                    ConfigFile::read(&p)?
                }
                None => ConfigFile::default(),
            },
        };
        let defaults = Defaults {
            cache_dir: default_cache_dir()?,
            bin_dir: default_bin_dir()?,
        };
        Self::from_sources(file, &defaults, |key| std::env::var(key).ok())
    }

    /// Layers `file` and then `env` over built-in defaults and validates the result.
    pub fn from_sources<F>(file: ConfigFile, defaults: &Defaults, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let pick = |key: &str, from_file: Option<String>| env(key).or(from_file);

        let owner = pick("RELINST_OWNER", file.owner).unwrap_or_default();
        let repo = pick("RELINST_REPO", file.repo).unwrap_or_default();
        if owner.trim().is_empty() || repo.trim().is_empty() {
            return Err(Error::Configuration(
                "repository owner and name are required (RELINST_OWNER / RELINST_REPO or config file)"
                    .to_string(),
            )
            .into());
        }

        let mut cfg = Self::for_repo(owner.trim(), repo.trim());
        if let Some(project) = pick("RELINST_PROJECT", file.project) {
            cfg.project = project;
        }
        cfg.binary = pick("RELINST_BINARY", file.binary).unwrap_or_else(|| cfg.project.clone());
        if let Some(format) = pick("RELINST_FORMAT", file.format) {
            cfg.format = format.parse()?;
        }
        if let Some(t) = pick("RELINST_ASSET_TEMPLATE", file.asset_template) {
            cfg.asset_template = t;
        }
        if let Some(t) = pick("RELINST_CHECKSUM_TEMPLATE", file.checksum_template) {
            cfg.checksum_template = t;
        }
        if let Some(mode) = pick("RELINST_CHECKSUM_TEMPLATE_MODE", file.checksum_template_mode) {
            cfg.checksum_template_mode = mode.parse()?;
        }
        if let Some(list) = env("RELINST_CHECKSUM_FALLBACKS") {
            cfg.checksum_fallbacks = split_list(&list);
        } else if let Some(list) = file.checksum_fallbacks {
            cfg.checksum_fallbacks = list;
        }
        if let Some(list) = env("RELINST_PLATFORMS") {
            cfg.platforms = parse_platforms(&split_list(&list))?;
        } else if let Some(list) = file.platforms {
            cfg.platforms = parse_platforms(&list)?;
        }
        cfg.cache_dir = env("RELINST_CACHE_DIR")
            .map(PathBuf::from)
            .or(file.cache_dir)
            .unwrap_or_else(|| defaults.cache_dir.clone());
        cfg.bin_dir = env("RELINST_BIN_DIR")
            .map(PathBuf::from)
            .or(file.bin_dir)
            .unwrap_or_else(|| defaults.bin_dir.clone());
        if let Some(url) = pick("RELINST_API_URL", file.api_url) {
            cfg.api_url = url;
        }
        if let Some(url) = pick("RELINST_DOWNLOAD_URL", file.download_url) {
            cfg.download_url = url;
        }
        cfg.github_token = env("GITHUB_TOKEN");

        cfg.validate()?;
        Ok(cfg)
    }

    /// Replaces the install directory (the `-b` flag).
    pub fn with_bin_dir(mut self, bin_dir: PathBuf) -> Self {
        self.bin_dir = bin_dir;
        self
    }

    pub fn owner_repo(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.project.trim().is_empty() || self.binary.trim().is_empty() {
            return Err(Error::Configuration("project and binary names must not be empty".into()));
        }
        if self.binary.contains('/') || self.binary.contains('\\') {
            return Err(Error::Configuration(format!(
                "binary name {:?} must not contain a path separator",
                self.binary
            )));
        }
        if self.asset_template.trim().is_empty() {
            return Err(Error::Configuration("asset template must not be empty".into()));
        }
        if self.platforms.is_empty() {
            return Err(Error::Configuration("no supported platforms configured".into()));
        }
        Ok(())
    }
}

/// User directories substituted when neither file nor environment set them.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub cache_dir: PathBuf,
    pub bin_dir: PathBuf,
}

#[cfg(unix)]
pub fn default_config_path() -> Option<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("relinst").ok()?;
    xdg_dirs.find_config_file("config.toml")
}

#[cfg(not(unix))]
pub fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("relinst").join("config.toml");
    path.exists().then_some(path)
}

#[cfg(unix)]
fn default_cache_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("relinst")?;
    Ok(xdg_dirs.get_cache_home().join("relinst"))
}

#[cfg(not(unix))]
fn default_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("no user cache directory")?;
    Ok(base.join("relinst"))
}

fn default_bin_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::executable_dir() {
        return Ok(dir);
    }
    let home = dirs::home_dir().context("no home directory")?;
    Ok(home.join(".local").join("bin"))
}
