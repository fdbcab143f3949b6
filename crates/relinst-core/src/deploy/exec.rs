//! Replace the current process with the launched tool.

use anyhow::{Context, Result};
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Runs `exe` with `args` exactly as captured. On Unix this never returns on
/// success: the process image is replaced and no cleanup runs afterwards.
#[cfg(unix)]
pub fn exec_tool(exe: &Path, args: &[OsString]) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;

    reattach_terminal();
    tracing::debug!("exec {} ({} args)", exe.display(), args.len());
    let err = Command::new(exe).args(args).exec();
    Err(err).with_context(|| format!("exec {}", exe.display()))
}

/// Spawns `exe`, waits, and exits with its status.
#[cfg(not(unix))]
pub fn exec_tool(exe: &Path, args: &[OsString]) -> Result<Infallible> {
    let status = Command::new(exe)
        .args(args)
        .status()
        .with_context(|| format!("run {}", exe.display()))?;
    std::process::exit(status.code().unwrap_or(1));
}

/// When stdin is not a terminal (e.g. `curl ... | sh`) but a controlling
/// terminal exists, points fds 0-2 at `/dev/tty` so interactive tools work.
#[cfg(unix)]
fn reattach_terminal() {
    use std::io::IsTerminal;
    use std::os::unix::io::AsRawFd;

    if std::io::stdin().is_terminal() {
        return;
    }
    let tty = match std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")
    {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!("no terminal to reattach: {}", e);
            return;
        }
    };
    let fd = tty.as_raw_fd();
    for target in 0..=2 {
        // SAFETY: both descriptors are valid; dup2 only replaces `target`.
        if unsafe { libc::dup2(fd, target) } < 0 {
            tracing::debug!("dup2 onto fd {} failed: {}", target, std::io::Error::last_os_error());
        }
    }
    tracing::debug!("reattached stdio to /dev/tty");
}
