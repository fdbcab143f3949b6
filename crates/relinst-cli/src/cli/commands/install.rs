//! Install mode: verify and copy the binary into the bin directory.

use anyhow::Result;
use relinst_core::deploy::Deployer;

pub fn run_install(deployer: &Deployer<'_>, tag: &str) -> Result<()> {
    let installed = deployer.install(tag)?;
    println!(
        "installed {} to {} (sha256 {})",
        installed.tag,
        installed.path.display(),
        installed.digest
    );
    Ok(())
}
