//! The [`CalendarTransport`] trait.
//!
//! A transport is the single seam between the sync pipeline and a calendar
//! server. [`CalDavTransport`](crate::caldav::CalDavTransport) speaks HTTP;
//! [`MemoryTransport`](crate::MemoryTransport) keeps everything in memory.

use std::future::Future;
use std::pin::Pin;

use calredact_core::{CalendarQuery, Component};

use crate::error::TransportResult;

/// Information about a calendar collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// The collection path (or absolute URL) on the server.
    pub path: String,
    /// Human-readable name, if the server reports one.
    pub name: Option<String>,
    /// Description of the calendar, if available.
    pub description: Option<String>,
    /// Component types the calendar accepts (`VEVENT`, `VTODO`, ...).
    pub components: Vec<String>,
    /// Collection tag, changes whenever an object does.
    pub ctag: Option<String>,
}

impl CalendarInfo {
    /// Creates a calendar entry with only a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            description: None,
            components: Vec::new(),
            ctag: None,
        }
    }

    /// Builder method to set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the supported component types.
    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the display name, falling back to the path.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }

    /// Returns true if the calendar accepts `component`. A calendar that
    /// doesn't advertise its components accepts everything.
    pub fn supports(&self, component: &str) -> bool {
        self.components.is_empty() || self.components.iter().any(|c| c == component)
    }
}

/// One raw calendar object returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    /// The object path.
    pub path: String,
    /// The object's ETag, if reported.
    pub etag: Option<String>,
    /// The undecoded iCalendar payload.
    pub data: Vec<u8>,
}

impl CalendarObject {
    /// Creates an object from its path and payload.
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            etag: None,
            data: data.into(),
        }
    }

    /// Builder method to set the ETag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe, so pipelines can hold a
/// `Box<dyn CalendarTransport>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access to a calendar server.
///
/// Implementations must be `Send + Sync`. They never retry; a failed call
/// returns its [`TransportError`](crate::TransportError) unchanged.
pub trait CalendarTransport: Send + Sync {
    /// Returns the name of this transport (e.g. "caldav", "memory").
    fn name(&self) -> &str;

    /// Resolves the authenticated user's principal path.
    fn current_user_principal(&self) -> BoxFuture<'_, TransportResult<String>>;

    /// Resolves the calendar home set of a principal.
    fn calendar_home_set<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, TransportResult<String>>;

    /// Lists the calendars under a home set.
    fn calendars<'a>(&'a self, home_set: &'a str) -> BoxFuture<'a, TransportResult<Vec<CalendarInfo>>>;

    /// Runs a calendar query against one calendar collection.
    fn query_calendar<'a>(
        &'a self,
        calendar: &'a str,
        query: &'a CalendarQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<CalendarObject>>>;

    /// Stores a calendar object at `path`, replacing any existing one.
    fn put_calendar_object<'a>(
        &'a self,
        path: &'a str,
        calendar: &'a Component,
    ) -> BoxFuture<'a, TransportResult<CalendarObject>>;
}

impl<T: CalendarTransport + ?Sized> CalendarTransport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn current_user_principal(&self) -> BoxFuture<'_, TransportResult<String>> {
        (**self).current_user_principal()
    }

    fn calendar_home_set<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, TransportResult<String>> {
        (**self).calendar_home_set(principal)
    }

    fn calendars<'a>(&'a self, home_set: &'a str) -> BoxFuture<'a, TransportResult<Vec<CalendarInfo>>> {
        (**self).calendars(home_set)
    }

    fn query_calendar<'a>(
        &'a self,
        calendar: &'a str,
        query: &'a CalendarQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<CalendarObject>>> {
        (**self).query_calendar(calendar, query)
    }

    fn put_calendar_object<'a>(
        &'a self,
        path: &'a str,
        calendar: &'a Component,
    ) -> BoxFuture<'a, TransportResult<CalendarObject>> {
        (**self).put_calendar_object(path, calendar)
    }
}
