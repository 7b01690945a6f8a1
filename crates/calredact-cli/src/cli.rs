//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// calredact - Redacted views of a CalDAV calendar
#[derive(Debug, Parser)]
#[command(name = "calredact")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALREDACT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, conflicts_with = "debug")]
    pub log_json: bool,

    // --- Connection overrides ---
    /// CalDAV root URL
    #[arg(long, env = "CALDAV_ROOT")]
    pub url: Option<String>,

    /// CalDAV username
    #[arg(long, env = "CALDAV_USER")]
    pub user: Option<String>,

    /// CalDAV password
    #[arg(long, env = "CALDAV_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the principal, calendar home set and calendars
    Discover,

    /// Fetch events, redact them and print the result
    Sync {
        /// Calendar to query, by index or path (defaults to the first)
        #[arg(long)]
        calendar: Option<String>,

        /// Output records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a test event one hour from now
    Create {
        /// Event summary
        #[arg(long, default_value = "calredact test event")]
        summary: String,

        /// Value for the X-PROTEI-SENDERID property
        #[arg(long, default_value = "12345")]
        sender_id: String,

        /// Calendar to store the event in, by index or path (defaults to the first)
        #[arg(long)]
        calendar: Option<String>,

        /// Print the calendar object instead of storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,
    /// Validate the configuration
    Validate,
    /// Show the configuration file path
    Path,
}
