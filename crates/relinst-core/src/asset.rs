//! Asset naming: expected release filename and checksum-file candidates.
//!
//! Templates are expanded in a single left-to-right pass; substituted values
//! are never re-scanned, and unknown `{placeholders}` are kept literally.

use crate::checksum::ChecksumMode;
use crate::config::ProjectConfig;
use crate::error::Error;
use crate::platform::Platform;
use std::fmt;
use std::str::FromStr;

/// Container format of the release asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    /// gzip-compressed tar published as `.tar.gz`.
    TarGz,
    /// gzip-compressed tar published as `.tgz`.
    Tgz,
    Zip,
    /// The asset is the executable itself.
    Raw,
}

impl ArchiveFormat {
    /// Filename extension without the leading dot; empty for raw binaries.
    pub fn ext(self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Tgz => "tgz",
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Raw => "",
        }
    }

    pub fn is_archive(self) -> bool {
        self != ArchiveFormat::Raw
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "tar" => Ok(ArchiveFormat::Tar),
            "tar.gz" | "tar+gzip" | "tar+gz" => Ok(ArchiveFormat::TarGz),
            "tgz" => Ok(ArchiveFormat::Tgz),
            "zip" => Ok(ArchiveFormat::Zip),
            "raw" | "binary" | "bin" | "" => Ok(ArchiveFormat::Raw),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Raw => f.write_str("raw"),
            other => f.write_str(other.ext()),
        }
    }
}

/// Expands `{name}` placeholders found in `vars`; everything else is literal.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let value = tail
            .find('}')
            .and_then(|close| {
                let key = &tail[..close];
                vars.iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (*v, close))
            });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders the asset base name from `{project}`, `{tag}`, `{os}`, `{arch}`.
pub fn render_asset_name(template: &str, project: &str, tag: &str, os: &str, arch: &str) -> String {
    render(
        template,
        &[("project", project), ("tag", tag), ("os", os), ("arch", arch)],
    )
}

/// Renders a checksum filename; additionally knows `{asset}` (base name) and `{ext}`.
pub fn render_checksum_name(
    template: &str,
    asset: &str,
    ext: &str,
    project: &str,
    tag: &str,
    os: &str,
    arch: &str,
) -> String {
    render(
        template,
        &[
            ("asset", asset),
            ("ext", ext),
            ("project", project),
            ("tag", tag),
            ("os", os),
            ("arch", arch),
        ],
    )
}

/// One checksum file to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumCandidate {
    pub name: String,
    pub mode: ChecksumMode,
}

/// Everything derived from the resolved `(project, tag, platform)` tuple.
#[derive(Debug, Clone)]
pub struct AssetDescriptor {
    /// Template output without extension.
    pub base_name: String,
    /// Remote filename (`base_name` plus `.ext` unless raw).
    pub filename: String,
    pub ext: String,
    pub format: ArchiveFormat,
    pub checksum_candidates: Vec<ChecksumCandidate>,
}

impl AssetDescriptor {
    pub fn new(config: &ProjectConfig, tag: &str, platform: &Platform) -> Self {
        let (os, arch) = (platform.os.as_str(), platform.arch.as_str());
        let base_name = render_asset_name(&config.asset_template, &config.project, tag, os, arch);
        let ext = config.format.ext().to_string();
        let filename = if ext.is_empty() {
            base_name.clone()
        } else {
            format!("{}.{}", base_name, ext)
        };

        let per_asset = |template: &str| {
            render_checksum_name(template, &base_name, &ext, &config.project, tag, os, arch)
        };
        let mut names: Vec<ChecksumCandidate> = Vec::new();
        let mut push = |name: String, mode: ChecksumMode| {
            if !name.is_empty() && !names.iter().any(|c| c.name == name) {
                names.push(ChecksumCandidate { name, mode });
            }
        };
        // A primary name that is also a configured manifest is read as one.
        let primary = per_asset(&config.checksum_template);
        let primary_mode = if config.checksum_fallbacks.contains(&primary) {
            ChecksumMode::Manifest
        } else {
            config.checksum_template_mode
        };
        push(primary, primary_mode);
        push(per_asset("{asset}.sha256"), ChecksumMode::PerAsset);
        if !ext.is_empty() {
            push(per_asset("{asset}.{ext}.sha256"), ChecksumMode::PerAsset);
        }
        for fallback in &config.checksum_fallbacks {
            push(fallback.clone(), ChecksumMode::Manifest);
        }

        Self {
            base_name,
            filename,
            ext,
            format: config.format,
            checksum_candidates: names,
        }
    }

    /// Candidate names, for diagnostics.
    pub fn candidate_names(&self) -> Vec<String> {
        self.checksum_candidates
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Mode of a candidate by its filename, if it is one.
    pub fn mode_of(&self, name: &str) -> Option<ChecksumMode> {
        self.checksum_candidates
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.mode)
    }
}
