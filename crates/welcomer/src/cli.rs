//! Command-line interface for the welcomer.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments. Anything set here overrides the configuration file.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    fn command() -> Command {
        Command::new("Player Welcomer")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Welcome new players and reward the veterans who greet them")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> CliArgs {
        CliArgs::from_matches(CliArgs::command().get_matches_from(args))
    }

    #[test]
    fn test_defaults() {
        let args = parse_from(&["welcomer"]);
        assert_eq!(args.config_path, PathBuf::from("config.toml"));
        assert_eq!(args.log_level, None);
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let args = parse_from(&[
            "welcomer",
            "--config",
            "/etc/welcomer.toml",
            "-l",
            "debug",
            "--json-logs",
        ]);
        assert_eq!(args.config_path, PathBuf::from("/etc/welcomer.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }
}
