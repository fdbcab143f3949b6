//! Per-(owner, repo, tag, platform) cache slots.
//!
//! Layout: `{root}/{owner}/{repo}/{tag}/{os}-{arch}/` holding the downloaded
//! asset, its checksum source (under the candidate's remote name), and the
//! executable at `bin/{binary}`. An executable that exists with an execute
//! bit is trusted without re-hashing; there is no separate "verified" marker.
//! Slots are not locked; concurrent runs may race on extraction.

use crate::asset::AssetDescriptor;
use crate::checksum::ChecksumMode;
use crate::platform::Platform;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Progress of a slot: `Empty → Downloaded → Verified → Extracted`.
/// [`CacheSlot::state`] never reports `Verified`, since nothing on disk
/// records it; a run holds it between verification and extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Downloaded,
    Verified,
    Extracted,
}

impl SlotState {
    /// The state a successful pipeline step leads to; `None` once extracted.
    pub fn next(self) -> Option<SlotState> {
        match self {
            SlotState::Empty => Some(SlotState::Downloaded),
            SlotState::Downloaded => Some(SlotState::Verified),
            SlotState::Verified => Some(SlotState::Extracted),
            SlotState::Extracted => None,
        }
    }
}

/// Makes one path component safe: separators and control characters become
/// `_`, and `.`/`..`/empty map to `_`.
fn path_component(raw: &str) -> String {
    let out: String = raw
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if out.is_empty() || out == "." || out == ".." {
        "_".to_string()
    } else {
        out
    }
}

/// Slot directory for a resolved release on a platform.
pub fn slot_path(cache_root: &Path, owner: &str, repo: &str, tag: &str, platform: &Platform) -> PathBuf {
    cache_root
        .join(path_component(owner))
        .join(path_component(repo))
        .join(path_component(tag))
        .join(path_component(&platform.slot_name()))
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Sets mode 0755 on Unix.
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// One cache slot and the names of its entries.
#[derive(Debug, Clone)]
pub struct CacheSlot {
    dir: PathBuf,
    asset_filename: String,
    binary: String,
}

impl CacheSlot {
    pub fn new(dir: PathBuf, asset: &AssetDescriptor, binary: &str) -> Self {
        Self {
            dir,
            asset_filename: asset.filename.clone(),
            binary: binary.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn asset_path(&self) -> PathBuf {
        self.dir.join(&self.asset_filename)
    }

    pub fn checksum_path(&self, candidate: &str) -> PathBuf {
        self.dir.join(candidate)
    }

    pub fn executable_path(&self) -> PathBuf {
        self.dir.join("bin").join(&self.binary)
    }

    /// Scratch directory archives are unpacked into.
    pub fn unpack_dir(&self) -> PathBuf {
        self.dir.join("unpack")
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create cache slot {}", self.dir.display()))
    }

    /// Existence plus an execute bit; no re-hash.
    pub fn has_valid_executable(&self) -> bool {
        is_executable(&self.executable_path())
    }

    /// First checksum candidate already stored in the slot.
    pub fn cached_checksum(&self, asset: &AssetDescriptor) -> Option<(PathBuf, ChecksumMode)> {
        asset.checksum_candidates.iter().find_map(|c| {
            let path = self.checksum_path(&c.name);
            path.is_file().then_some((path, c.mode))
        })
    }

    pub fn state(&self, asset: &AssetDescriptor) -> SlotState {
        if self.has_valid_executable() {
            SlotState::Extracted
        } else if self.asset_path().is_file() && self.cached_checksum(asset).is_some() {
            SlotState::Downloaded
        } else {
            SlotState::Empty
        }
    }

    /// Drops every entry so the next access re-downloads.
    pub fn invalidate(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("remove cache slot {}", self.dir.display()))?;
        }
        tracing::debug!("invalidated cache slot {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    fn slot(root: &Path) -> (CacheSlot, AssetDescriptor) {
        let cfg = ProjectConfig::for_repo("acme", "tool");
        let platform = Platform::new("linux", "amd64");
        let asset = AssetDescriptor::new(&cfg, "v1", &platform);
        let dir = slot_path(root, "acme", "tool", "v1", &platform);
        (CacheSlot::new(dir, &asset, "tool"), asset)
    }

    #[test]
    fn states_advance_in_pipeline_order() {
        let mut seen = vec![SlotState::Empty];
        while let Some(next) = seen[seen.len() - 1].next() {
            seen.push(next);
        }
        assert_eq!(
            seen,
            vec![
                SlotState::Empty,
                SlotState::Downloaded,
                SlotState::Verified,
                SlotState::Extracted
            ]
        );
    }

    #[test]
    fn slot_path_layout() {
        let p = slot_path(
            Path::new("/c"),
            "acme",
            "tool",
            "v1.2.3",
            &Platform::new("linux", "arm64"),
        );
        assert_eq!(p, PathBuf::from("/c/acme/tool/v1.2.3/linux-arm64"));
    }

    #[test]
    fn slot_path_components_cannot_escape() {
        let p = slot_path(
            Path::new("/c"),
            "acme",
            "..",
            "release/v1",
            &Platform::new("linux", "amd64"),
        );
        assert_eq!(p, PathBuf::from("/c/acme/_/release_v1/linux-amd64"));
    }

    #[test]
    fn state_transitions() {
        let root = tempfile::tempdir().unwrap();
        let (slot, asset) = slot(root.path());
        assert_eq!(slot.state(&asset), SlotState::Empty);

        slot.ensure_dir().unwrap();
        fs::write(slot.asset_path(), b"archive").unwrap();
        assert_eq!(slot.state(&asset), SlotState::Empty);
        fs::write(slot.checksum_path("checksums.txt"), b"digest").unwrap();
        assert_eq!(slot.state(&asset), SlotState::Downloaded);
        let (path, mode) = slot.cached_checksum(&asset).unwrap();
        assert!(path.ends_with("checksums.txt"));
        assert_eq!(mode, ChecksumMode::Manifest);

        fs::create_dir_all(slot.executable_path().parent().unwrap()).unwrap();
        fs::write(slot.executable_path(), b"#!/bin/sh\n").unwrap();
        set_executable(&slot.executable_path()).unwrap();
        assert!(slot.has_valid_executable());
        assert_eq!(slot.state(&asset), SlotState::Extracted);

        slot.invalidate().unwrap();
        assert_eq!(slot.state(&asset), SlotState::Empty);
        assert!(!slot.dir().exists());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_not_trusted() {
        let root = tempfile::tempdir().unwrap();
        let (slot, _) = slot(root.path());
        fs::create_dir_all(slot.executable_path().parent().unwrap()).unwrap();
        fs::write(slot.executable_path(), b"data").unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(slot.executable_path(), fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!slot.has_valid_executable());
    }
}
