//! Logging init: structured events to stderr, with a plain fallback.
//!
//! stdout is left alone so a launched tool owns it.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "info,relinst_core=debug,relinst=debug"
    } else {
        "info"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
/// Returns Err if a global subscriber is already set, so the caller can fall back.
pub fn init_logging(verbose: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    tracing::debug!("relinst logging initialized (verbose: {})", verbose);
    Ok(())
}

/// Plain stderr logging at `info`, ignoring `RUST_LOG`. Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(std::io::stderr)
        .without_time()
        .with_ansi(false)
        .try_init();
}
