//! Launch mode: run the cached binary in place of this process.

use anyhow::Result;
use relinst_core::deploy::Deployer;
use std::ffi::OsString;

/// Only returns on failure.
pub fn run_launch(
    deployer: &Deployer<'_>,
    tag: &str,
    tool_args: &[OsString],
    verify_cache: bool,
) -> Result<()> {
    match deployer.launch(tag, tool_args, verify_cache)? {}
}
