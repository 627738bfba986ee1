//! CLI argument definitions for graphwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Graphwatch event normalization and graph correlation daemon.
///
/// Consumes raw security events, normalizes them into the canonical
/// schema, writes them into the property graph, and runs stored
/// detection rules against the graph.
#[derive(Parser, Debug)]
#[command(name = "graphwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to graphwatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/graphwatch/graphwatch.toml")]
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

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let cli = DaemonCli::parse_from(["graphwatch-daemon"]);
        assert_eq!(
            cli.config,
            PathBuf::from("/etc/graphwatch/graphwatch.toml")
        );
        assert!(cli.log_level.is_none());
        assert!(!cli.validate);
    }

    #[test]
    fn overrides_parse() {
        let cli = DaemonCli::parse_from([
            "graphwatch-daemon",
            "--config",
            "/tmp/g.toml",
            "--log-level",
            "debug",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/g.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.validate);
    }
}
