//! CLI interface for Dozio
//!
//! Defines the commands and global flags of the `dozio` binary using clap's
//! derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dozio team task and reporting bot
///
/// Runs the Telegram bot for an admin, their managers and the managers'
/// teams, and inspects the bot's database from the terminal.
#[derive(Parser, Debug)]
#[command(name = "dozio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the bot until interrupted
    Start,

    /// Store the Telegram bot token in the system keychain
    Setup,

    /// Check configuration, database and token
    Doctor,

    /// Print the admin, managers and their teams
    Users,

    /// Print every task that is not done yet
    Tasks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["dozio", "start"]);
        assert_eq!(cli.command, Command::Start);
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "dozio",
            "tasks",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/dozio.toml",
        ]);
        assert_eq!(cli.command, Command::Tasks);
        assert!(cli.json);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/dozio.toml")));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["dozio", "run", "x"]).is_err());
        assert!(Cli::try_parse_from(["dozio"]).is_err());
    }
}
