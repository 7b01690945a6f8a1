//! CLI error types.

use std::fmt;

use calredact_caldav::{SyncError, TransportError};

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// The calendar selector matched nothing.
    Selection(String),
    /// The server or transport failed.
    Transport(TransportError),
    /// The sync run was cancelled.
    Cancelled,
    /// Rendering output failed.
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Selection(msg) => write!(f, "calendar selection failed: {}", msg),
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Output(msg) => write!(f, "output error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for CliError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Transport(e) => Self::Transport(e),
            SyncError::Cancelled => Self::Cancelled,
        }
    }
}
