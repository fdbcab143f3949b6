//! Failure taxonomy for a resolve/fetch/verify/deploy run.
//!
//! Component functions return `anyhow::Result` and attach I/O context freely;
//! the variants here are the root causes callers may inspect with
//! `downcast_ref::<Error>()`.

use thiserror::Error;

/// Every variant is fatal to the current run.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or a host platform outside the allow-list.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested release could not be turned into a canonical tag.
    #[error("could not resolve release {requested:?} for {repo} (tried: {})", list(.tried))]
    Resolution {
        repo: String,
        requested: String,
        tried: Vec<String>,
    },

    /// An asset or every checksum candidate was unreachable.
    #[error(
        "download failed for {what} (platform {platform}, tag {tag}; checksum candidates tried: {})",
        list(.candidates)
    )]
    Download {
        what: String,
        platform: String,
        tag: String,
        candidates: Vec<String>,
    },

    #[error("verification of {asset} failed: {source}")]
    Verification {
        asset: String,
        #[source]
        source: VerifyError,
    },

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("no executable named {binary:?} (or project {project:?}) found under {dir}")]
    ExecutableNotFound {
        dir: String,
        binary: String,
        project: String,
    },
}

/// Outcome of a failed checksum comparison.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("digest mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },

    #[error("no usable digest for {asset} in {source_name}")]
    MissingEntry { asset: String, source_name: String },
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

impl Error {
    /// True for digest mismatches and missing entries.
    pub fn is_verification(&self) -> bool {
        matches!(self, Error::Verification { .. })
    }
}
