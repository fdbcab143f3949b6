//! CLI for relinst.

mod commands;

use anyhow::Result;
use clap::Parser;
use relinst_core::config::ProjectConfig;
use relinst_core::deploy::Deployer;
use relinst_core::fetch::CurlFetcher;
use relinst_core::{platform, release};
use std::ffi::OsString;
use std::path::PathBuf;

use commands::{run_install, run_launch};

/// Install or launch a checksum-verified prebuilt release binary.
#[derive(Debug, Parser)]
#[command(name = "relinst", version)]
#[command(about = "Install or launch a checksum-verified prebuilt release binary", long_about = None)]
pub struct Cli {
    /// Directory to install into (default: the user's binaries directory).
    #[arg(short = 'b', long = "bin-dir", value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Verbose (debug) logging on stderr.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Run the tool from the cache instead of installing it.
    #[arg(short = 'l', long = "launch")]
    pub launch: bool,

    /// Re-verify a cached executable's asset before launching it.
    #[arg(long, requires = "launch")]
    pub verify_cache: bool,

    /// Config file to read instead of the XDG one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Release tag, with or without the leading `v`.
    #[arg(default_value = release::LATEST)]
    pub tag: String,

    /// Arguments after `--`, passed to the tool unchanged.
    #[arg(last = true, value_name = "TOOL_ARGS")]
    pub tool_args: Vec<OsString>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let mut cfg = ProjectConfig::load(self.config.as_deref())?;
        if let Some(dir) = self.bin_dir {
            cfg = cfg.with_bin_dir(dir);
        }
        tracing::debug!(
            "config: repo {}, project {}, binary {}, format {}, cache {}, bin {}",
            cfg.owner_repo(),
            cfg.project,
            cfg.binary,
            cfg.format,
            cfg.cache_dir.display(),
            cfg.bin_dir.display()
        );

        let fetcher = CurlFetcher::new();
        let deployer = Deployer::new(&cfg, &fetcher, platform::detect())?;

        if self.launch {
            run_launch(&deployer, &self.tag, &self.tool_args, self.verify_cache)
        } else {
            if !self.tool_args.is_empty() {
                tracing::warn!("ignoring {} tool argument(s) in install mode", self.tool_args.len());
            }
            run_install(&deployer, &self.tag)
        }
    }
}

#[cfg(test)]
mod tests;
