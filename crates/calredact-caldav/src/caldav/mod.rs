//! CalDAV transport over HTTP.
//!
//! [`CalDavTransport`] implements [`CalendarTransport`](crate::CalendarTransport)
//! against a real server:
//!
//! - HTTP Basic authentication
//! - PROPFIND for principal, home set and calendar discovery
//! - REPORT `calendar-query` built from a [`CalendarQuery`](calredact_core::CalendarQuery)
//! - PUT of encoded iCalendar objects
//!
//! ```ignore
//! use calredact_caldav::caldav::{CalDavConfig, CalDavTransport};
//!
//! let config = CalDavConfig::new("https://caldav.example.com/dav/")?
//!     .with_credentials("user", "password");
//! let transport = CalDavTransport::new(config)?;
//! let principal = transport.current_user_principal().await?;
//! ```

mod auth;
mod client;
mod config;
mod transport;
pub mod xml;

pub use config::CalDavConfig;
pub use transport::CalDavTransport;
