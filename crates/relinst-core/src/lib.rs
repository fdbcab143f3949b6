//! Fetch, verify and run prebuilt release binaries from a GitHub-style host.

pub mod asset;
pub mod cache;
pub mod checksum;
pub mod config;
pub mod deploy;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod platform;
pub mod release;
pub mod unpack;

pub use error::{Error, VerifyError};
