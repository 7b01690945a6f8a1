//! Subcommand implementations.
//!
//! Commands are generic over [`CalendarTransport`] so they run the same
//! against a CalDAV server and an in-memory one.

pub mod config;
pub mod create;
pub mod discover;
pub mod sync;

use calredact_caldav::{CalendarInfo, CalendarTransport};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Result of walking principal -> home set -> calendars.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub principal: String,
    pub home_set: String,
    pub calendars: Vec<CalendarInfo>,
}

impl Discovery {
    /// Runs the discovery chain.
    pub async fn run<T: CalendarTransport>(transport: &T) -> CliResult<Self> {
        let principal = transport.current_user_principal().await?;
        debug!(principal = %principal, "Found principal");
        let home_set = transport.calendar_home_set(&principal).await?;
        debug!(home_set = %home_set, "Found calendar home set");
        let calendars = transport.calendars(&home_set).await?;

        Ok(Self {
            principal,
            home_set,
            calendars,
        })
    }

    /// Picks a calendar by index or path; the first one when no selector
    /// is given.
    pub fn select(&self, selector: Option<&str>) -> CliResult<&CalendarInfo> {
        if self.calendars.is_empty() {
            return Err(CliError::Selection(format!(
                "no calendars under {}",
                self.home_set
            )));
        }

        let Some(selector) = selector else {
            return Ok(&self.calendars[0]);
        };

        if let Ok(index) = selector.parse::<usize>() {
            return self.calendars.get(index).ok_or_else(|| {
                CliError::Selection(format!(
                    "index {} out of range ({} calendars)",
                    index,
                    self.calendars.len()
                ))
            });
        }

        let wanted = selector.trim_end_matches('/');
        self.calendars
            .iter()
            .find(|c| c.path.trim_end_matches('/') == wanted)
            .ok_or_else(|| CliError::Selection(format!("no calendar at {}", selector)))
    }
}
