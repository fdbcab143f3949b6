//! SHA-256 verification of downloaded assets against a checksum source.
//!
//! The source is either a per-asset file (often just the digest) or a
//! manifest listing many `digest  filename` lines. See [`ChecksumMode`].

mod manifest;

pub use manifest::extract_digest;

use crate::error::{Error, VerifyError};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

/// Sources shorter than this cannot hold a SHA-256 digest and are rejected
/// before hashing (e.g. an empty body or a stray error string).
pub const MIN_SOURCE_LEN: u64 = 32;

/// How a checksum source is searched for the asset's digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumMode {
    /// A file published for this asset only: a line naming the asset wins,
    /// otherwise the first token of the first line is the digest.
    PerAsset,
    /// A multi-entry manifest: a line naming the asset is required.
    Manifest,
}

impl FromStr for ChecksumMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-asset" | "perasset" | "single" => Ok(ChecksumMode::PerAsset),
            "manifest" => Ok(ChecksumMode::Manifest),
            _ => Err(Error::Configuration(format!(
                "invalid checksum mode {:?}, expected per-asset or manifest",
                s
            ))),
        }
    }
}

impl fmt::Display for ChecksumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumMode::PerAsset => f.write_str("per-asset"),
            ChecksumMode::Manifest => f.write_str("manifest"),
        }
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

/// Verifies `asset` against the digest listed for `expected_filename` in `source`.
/// Returns the verified lowercase digest.
///
/// Failures carry [`Error::Verification`] as root cause.
pub fn verify(
    asset: &Path,
    source: &Path,
    expected_filename: &str,
    mode: ChecksumMode,
) -> Result<String> {
    let source_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    let missing = || Error::Verification {
        asset: expected_filename.to_string(),
        source: VerifyError::MissingEntry {
            asset: expected_filename.to_string(),
            source_name: source_name.clone(),
        },
    };

    let len = std::fs::metadata(source)
        .with_context(|| format!("stat {}", source.display()))?
        .len();
    if len < MIN_SOURCE_LEN {
        tracing::debug!("checksum source {} too small ({} bytes)", source.display(), len);
        return Err(missing().into());
    }

    let bytes = std::fs::read(source).with_context(|| format!("read {}", source.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let expected = extract_digest(&text, expected_filename, mode).ok_or_else(missing)?;

    let actual = sha256_path(asset)?;
    if actual != expected {
        return Err(Error::Verification {
            asset: expected_filename.to_string(),
            source: VerifyError::Mismatch { expected, actual },
        }
        .into());
    }
    tracing::debug!("verified {} sha256={}", expected_filename, actual);
    Ok(actual)
}
