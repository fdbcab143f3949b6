//! CLI command handlers, one per mode.

mod install;
mod launch;

pub use install::run_install;
pub use launch::run_launch;
