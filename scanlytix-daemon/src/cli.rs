//! CLI argument definitions for scanlytix-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Scanlytix scan result correlation daemon.
///
/// Reads project, policy and scan data from a snapshot directory,
/// flattens new scan results into records and repeats on a fixed interval.
#[derive(Parser, Debug)]
#[command(name = "scanlytix-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to scanlytix.toml configuration file.
    #[arg(short, long, default_value = "/etc/scanlytix/scanlytix.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without running a sweep.
    #[arg(long)]
    pub validate: bool,

    /// Run a single sweep and exit, ignoring `sweep_interval_secs`.
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = DaemonCli::try_parse_from(["scanlytix-daemon"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/scanlytix/scanlytix.toml"));
        assert!(cli.log_level.is_none());
        assert!(!cli.validate);
        assert!(!cli.once);
    }

    #[test]
    fn overrides() {
        let cli = DaemonCli::try_parse_from([
            "scanlytix-daemon",
            "-c",
            "/tmp/scanlytix.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--once",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/scanlytix.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.once);
    }
}
