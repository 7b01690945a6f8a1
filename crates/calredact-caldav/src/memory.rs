//! In-memory [`CalendarTransport`].
//!
//! Holds a fixed principal and home set, a list of calendars, and the raw
//! objects stored in each. Queries are answered by decoding every object
//! and evaluating the query filter locally.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use calredact_core::{CalendarQuery, Component};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{TransportError, TransportResult};
use crate::ics;
use crate::transport::{BoxFuture, CalendarInfo, CalendarObject, CalendarTransport};

/// Default principal path.
pub const DEFAULT_PRINCIPAL: &str = "/user/";
/// Default calendar home set path.
pub const DEFAULT_HOME_SET: &str = "/user/calendars/";

/// A calendar server held in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    principal: String,
    home_set: String,
    calendars: Vec<CalendarInfo>,
    objects: RwLock<BTreeMap<String, Vec<CalendarObject>>>,
    generation: AtomicU64,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates an empty server with the default principal and home set.
    pub fn new() -> Self {
        Self {
            principal: DEFAULT_PRINCIPAL.to_string(),
            home_set: DEFAULT_HOME_SET.to_string(),
            calendars: Vec::new(),
            objects: RwLock::new(BTreeMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Builder method to add a calendar collection.
    pub fn with_calendar(mut self, calendar: CalendarInfo) -> Self {
        self.objects
            .get_mut()
            .entry(calendar.path.clone())
            .or_default();
        self.calendars.push(calendar);
        self
    }

    /// Builder method to store a raw object in a calendar.
    ///
    /// The payload is stored as given, so malformed data can be served.
    pub fn with_object(mut self, calendar: &str, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let etag = self.next_etag();
        self.objects
            .get_mut()
            .entry(calendar.to_string())
            .or_default()
            .push(CalendarObject::new(path, data).with_etag(etag));
        self
    }

    /// Returns a snapshot of the objects stored in a calendar.
    pub async fn objects(&self, calendar: &str) -> Vec<CalendarObject> {
        self.objects
            .read()
            .await
            .get(calendar)
            .cloned()
            .unwrap_or_default()
    }

    fn next_etag(&self) -> String {
        self.generation.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Finds the calendar owning an object path: the longest calendar path
    /// that prefixes it.
    fn owner_of(&self, path: &str) -> Option<&CalendarInfo> {
        self.calendars
            .iter()
            .filter(|c| {
                path.strip_prefix(c.path.trim_end_matches('/'))
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|c| c.path.len())
    }
}

/// Returns true if any calendar in the payload satisfies the query.
fn object_matches(object: &CalendarObject, query: &CalendarQuery) -> bool {
    match ics::decode(&object.data) {
        Ok(calendars) => calendars.iter().any(|c| query.matches(c)),
        Err(e) => {
            warn!(path = %object.path, error = %e, "Returning undecodable object unfiltered");
            true
        }
    }
}

impl CalendarTransport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn current_user_principal(&self) -> BoxFuture<'_, TransportResult<String>> {
        Box::pin(async move { Ok(self.principal.clone()) })
    }

    fn calendar_home_set<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, TransportResult<String>> {
        Box::pin(async move {
            if principal != self.principal {
                return Err(TransportError::not_found("Unknown principal").with_target(principal));
            }
            Ok(self.home_set.clone())
        })
    }

    fn calendars<'a>(&'a self, home_set: &'a str) -> BoxFuture<'a, TransportResult<Vec<CalendarInfo>>> {
        Box::pin(async move {
            if home_set != self.home_set {
                return Err(TransportError::not_found("Unknown home set").with_target(home_set));
            }
            Ok(self.calendars.clone())
        })
    }

    fn query_calendar<'a>(
        &'a self,
        calendar: &'a str,
        query: &'a CalendarQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<CalendarObject>>> {
        Box::pin(async move {
            let objects = self.objects.read().await;
            let stored = objects
                .get(calendar)
                .ok_or_else(|| TransportError::not_found("Calendar not found").with_target(calendar))?;

            let matched: Vec<_> = stored
                .iter()
                .filter(|object| object_matches(object, query))
                .cloned()
                .collect();

            debug!(
                calendar = %calendar,
                stored = stored.len(),
                matched = matched.len(),
                "Answered calendar query"
            );
            Ok(matched)
        })
    }

    fn put_calendar_object<'a>(
        &'a self,
        path: &'a str,
        calendar: &'a Component,
    ) -> BoxFuture<'a, TransportResult<CalendarObject>> {
        Box::pin(async move {
            let owner = self
                .owner_of(path)
                .ok_or_else(|| TransportError::not_found("No calendar owns this path").with_target(path))?;

            let object = CalendarObject::new(path, ics::encode(calendar)).with_etag(self.next_etag());

            let mut objects = self.objects.write().await;
            let stored = objects.entry(owner.path.clone()).or_default();
            match stored.iter_mut().find(|o| o.path == path) {
                Some(existing) => *existing = object.clone(),
                None => stored.push(object.clone()),
            }

            debug!(path = %path, calendar = %owner.path, "Stored calendar object");
            Ok(object)
        })
    }
}
