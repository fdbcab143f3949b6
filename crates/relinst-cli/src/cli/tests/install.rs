//! Tests for the default (install) mode.

use super::parse;
use crate::cli::Cli;
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_defaults() {
    let cli = parse(&["relinst"]);
    assert_eq!(cli.tag, "latest");
    assert!(!cli.launch);
    assert!(!cli.debug);
    assert!(!cli.verify_cache);
    assert!(cli.bin_dir.is_none());
    assert!(cli.config.is_none());
    assert!(cli.tool_args.is_empty());
}

#[test]
fn cli_parse_bin_dir_and_tag() {
    let cli = parse(&["relinst", "-b", "/opt/bin", "-d", "1.2.3"]);
    assert_eq!(cli.bin_dir.as_deref(), Some(Path::new("/opt/bin")));
    assert!(cli.debug);
    assert_eq!(cli.tag, "1.2.3");
}

#[test]
fn cli_parse_long_flags() {
    let cli = parse(&[
        "relinst",
        "--bin-dir",
        "/tmp/b",
        "--config",
        "/etc/relinst.toml",
        "v2.0.0",
    ]);
    assert_eq!(cli.bin_dir.as_deref(), Some(Path::new("/tmp/b")));
    assert_eq!(cli.config.as_deref(), Some(Path::new("/etc/relinst.toml")));
    assert_eq!(cli.tag, "v2.0.0");
}

#[test]
fn cli_rejects_second_positional() {
    assert!(Cli::try_parse_from(["relinst", "v1", "v2"]).is_err());
}

#[test]
fn cli_verify_cache_requires_launch() {
    assert!(Cli::try_parse_from(["relinst", "--verify-cache"]).is_err());
}

#[test]
fn cli_usage_error_exits_with_2() {
    let err = Cli::try_parse_from(["relinst", "--no-such-flag"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
