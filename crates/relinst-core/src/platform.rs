//! Host platform detection and allow-list check.
//!
//! Raw kernel/machine identifiers are normalized into the vocabulary release
//! assets are usually named with (`linux`, `darwin`, `amd64`, `arm64`, ...).

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Normalized `(os, arch)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Cache directory component, e.g. `linux-amd64`.
    pub fn slot_name(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

impl FromStr for Platform {
    type Err = Error;

    /// Parses `os/arch`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((os, arch)) if !os.is_empty() && !arch.is_empty() && !arch.contains('/') => {
                Ok(Platform::new(os, arch))
            }
            _ => Err(Error::Configuration(format!(
                "invalid platform {:?}, expected os/arch",
                s
            ))),
        }
    }
}

/// Maps a raw OS name (`uname -s` style or Rust's `std::env::consts::OS`).
pub fn normalize_os(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.starts_with("mingw")
        || lower.starts_with("msys")
        || lower.starts_with("cygwin")
        || lower == "windows_nt"
    {
        return "windows".to_string();
    }
    match lower.as_str() {
        "macos" => "darwin".to_string(),
        "sunos" => "solaris".to_string(),
        _ => lower,
    }
}

/// Maps a raw machine name (`uname -m` style or Rust's `std::env::consts::ARCH`).
/// ARM revisions stay distinct (`armv6`, `armv7`).
pub fn normalize_arch(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    match lower.as_str() {
        "x86_64" | "amd64" | "x64" => return "amd64".to_string(),
        "aarch64" | "arm64" | "aarch64_be" => return "arm64".to_string(),
        "i386" | "i486" | "i586" | "i686" | "x86" | "386" => return "386".to_string(),
        _ => {}
    }
    for rev in ["armv5", "armv6", "armv7"] {
        if lower.starts_with(rev) {
            return rev.to_string();
        }
    }
    lower
}

/// Detects the running host. Deterministic for a given machine.
pub fn detect() -> Platform {
    let (os, arch) = raw_host();
    Platform::new(normalize_os(&os), normalize_arch(&arch))
}

/// Pure membership test against the configured allow-list.
pub fn is_supported(platform: &Platform, allowed: &[Platform]) -> bool {
    allowed.iter().any(|p| p == platform)
}

/// Fails with a configuration error when `platform` is not allow-listed.
pub fn ensure_supported(platform: &Platform, allowed: &[Platform]) -> Result<(), Error> {
    if is_supported(platform, allowed) {
        return Ok(());
    }
    let allowed: Vec<String> = allowed.iter().map(|p| p.to_string()).collect();
    Err(Error::Configuration(format!(
        "platform {} is not supported (supported: {})",
        platform,
        allowed.join(" ")
    )))
}

#[cfg(unix)]
fn raw_host() -> (String, String) {
    // SAFETY: utsname is plain old data; uname fills it on success.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    let r = unsafe { libc::uname(&mut uts) };
    if r != 0 {
        return fallback_host();
    }
    let field = |raw: &[libc::c_char]| -> String {
        let bytes: Vec<u8> = raw
            .iter()
            .take_while(|c| **c != 0)
            .map(|c| *c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    };
    let os = field(&uts.sysname);
    let arch = field(&uts.machine);
    if os.is_empty() || arch.is_empty() {
        return fallback_host();
    }
    (os, arch)
}

#[cfg(not(unix))]
fn raw_host() -> (String, String) {
    fallback_host()
}

fn fallback_host() -> (String, String) {
    (
        std::env::consts::OS.to_string(),
        std::env::consts::ARCH.to_string(),
    )
}
