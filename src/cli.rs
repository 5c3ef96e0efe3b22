//! CLI definitions for pinsmith.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Pinsmith CLI.
#[derive(Parser)]
#[command(name = "pinsmith")]
#[command(about = "Pinterest pin-publishing automation")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/pinsmith.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Log in to the target site and persist the session artifact
    Login {
        /// User the session is stored under
        #[arg(long)]
        user: String,

        /// Account email address
        #[arg(long)]
        email: String,

        /// Environment variable holding the account password
        #[arg(long, default_value = "PINSMITH_PASSWORD")]
        password_env: String,
    },

    /// Publish a pin using a stored session
    Publish {
        /// User whose session to publish with
        #[arg(long)]
        user: String,

        /// Pin title
        #[arg(long)]
        title: String,

        /// Target board name (resolved against existing boards)
        #[arg(long)]
        board: String,

        /// Pin description
        #[arg(long)]
        description: Option<String>,

        /// Image: absolute local path or http(s) URL
        #[arg(long)]
        image: Option<String>,

        /// RFC 3339 timestamp to associate with the pin
        #[arg(long, value_parser = parse_timestamp)]
        scheduled_at: Option<DateTime<Utc>>,
    },

    /// Show whether a stored session exists
    Status {
        /// User to check
        #[arg(long)]
        user: String,
    },
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    value
        .parse::<DateTime<Utc>>()
        .map_err(|e| format!("invalid RFC 3339 timestamp: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2025-06-01T12:00:00Z").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_cli_parses_publish() {
        let cli = Cli::try_parse_from([
            "pinsmith", "publish", "--user", "u1", "--title", "T", "--board", "B",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish { user, title, board, .. } => {
                assert_eq!(user, "u1");
                assert_eq!(title, "T");
                assert_eq!(board, "B");
            }
            _ => panic!("expected publish command"),
        }
    }

    #[test]
    fn test_cli_requires_board() {
        let result =
            Cli::try_parse_from(["pinsmith", "publish", "--user", "u1", "--title", "T"]);
        assert!(result.is_err());
    }
}
