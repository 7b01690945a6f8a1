//! calredact command-line client.
//!
//! Discovers calendars on a CalDAV server, prints redacted event records
//! and creates test events.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{CliError, CliResult};
