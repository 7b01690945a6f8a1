//! CalDAV calendar-query model.
//!
//! A [`CalendarQuery`] pairs a [`CompRequest`] (which components and
//! properties the server should return) with a [`CompFilter`] (which
//! components should match). The values are plain data; encoding them onto
//! the wire is the transport's job.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::{self, Component};
use crate::time::{TimeRange, ZoneHint, offset, parse_date_time, parse_duration};

/// Properties requested for events by default.
pub const DEFAULT_EVENT_PROPS: &[&str] = &[
    "SUMMARY",
    "DESCRIPTION",
    "UID",
    "DTSTART",
    "DTEND",
    "DURATION",
    "LAST-MODIFIED",
    "X-PROTEI-SENDERID",
];

/// Which properties of which component types a query wants returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompRequest {
    /// The component name, e.g. `VCALENDAR`.
    pub name: String,
    /// Requested property names.
    #[serde(default)]
    pub properties: BTreeSet<String>,
    /// Requested sub-components.
    #[serde(default)]
    pub nested: Vec<CompRequest>,
}

impl CompRequest {
    /// Creates a request for a component with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeSet::new(),
            nested: Vec::new(),
        }
    }

    /// Builder method to request properties.
    pub fn with_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.extend(props.into_iter().map(Into::into));
        self
    }

    /// Builder method to add a nested request.
    pub fn with_nested(mut self, nested: CompRequest) -> Self {
        self.nested.push(nested);
        self
    }
}

/// Server-side selection predicate.
///
/// A component matches when its name matches, it overlaps the time range
/// (if any, and if the component type carries a time range), and every
/// nested filter is satisfied by at least one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompFilter {
    /// The component name to match.
    pub name: String,
    /// Optional `[start, end)` bound.
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    /// Nested filters, combined with AND.
    #[serde(default)]
    pub nested: Vec<CompFilter>,
}

impl CompFilter {
    /// Creates an unbounded filter for a component name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_range: None,
            nested: Vec::new(),
        }
    }

    /// Builder method to bound the filter in time.
    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Builder method to add a nested filter.
    pub fn with_nested(mut self, nested: CompFilter) -> Self {
        self.nested.push(nested);
        self
    }

    /// Evaluates the filter against a component, resolving floating times
    /// in UTC.
    pub fn matches(&self, component: &Component) -> bool {
        self.matches_in(component, ZoneHint::Utc)
    }

    /// Evaluates the filter, resolving floating times in `zone`.
    pub fn matches_in(&self, component: &Component, zone: ZoneHint) -> bool {
        if component.name != self.name {
            return false;
        }

        if let Some(range) = self.time_range
            && has_time_range(&component.name)
        {
            match occurrence(component, zone) {
                Some((start, end)) if range.overlaps(start, end) => {}
                _ => return false,
            }
        }

        self.nested.iter().all(|filter| {
            component
                .children
                .iter()
                .any(|child| filter.matches_in(child, zone))
        })
    }
}

/// Component types that carry an inherent occurrence interval.
fn has_time_range(name: &str) -> bool {
    matches!(
        name,
        component::EVENT | component::TODO | component::JOURNAL | component::FREE_BUSY
    )
}

/// Computes the occurrence interval of a time-bearing component.
///
/// The end comes from `DTEND`, `DUE`, or `DTSTART + DURATION`; without any of
/// them the occurrence is the start instant. Returns `None` without a
/// parsable start, or when the end falls past the representable calendar.
pub fn occurrence(component: &Component, zone: ZoneHint) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = component
        .prop("DTSTART")
        .and_then(|p| parse_date_time(p, zone).ok())?;

    let explicit = component
        .prop("DTEND")
        .or_else(|| component.prop("DUE"))
        .and_then(|p| parse_date_time(p, zone).ok());
    let end = match explicit {
        Some(end) => end,
        None => match component.value("DURATION").map(parse_duration) {
            Some(Ok(d)) => offset(start, d).ok()?,
            _ => start,
        },
    };

    Some((start, end.max(start)))
}

/// The body of a calendar-query REPORT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarQuery {
    /// What to return.
    pub request: CompRequest,
    /// What to match.
    pub filter: CompFilter,
}

impl CalendarQuery {
    /// Creates a query from its parts.
    pub fn new(request: CompRequest, filter: CompFilter) -> Self {
        Self { request, filter }
    }

    /// The standard event query: `VCALENDAR` (with `VERSION`) wrapping
    /// `VEVENT` with [`DEFAULT_EVENT_PROPS`], optionally bounded in time.
    pub fn events(range: Option<TimeRange>) -> Self {
        Self::for_component(component::EVENT, DEFAULT_EVENT_PROPS.iter().copied(), range)
    }

    /// A query for one component type inside `VCALENDAR`.
    pub fn for_component<I, S>(name: &str, props: I, range: Option<TimeRange>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = CompRequest::new(component::CALENDAR)
            .with_props(["VERSION"])
            .with_nested(CompRequest::new(name).with_props(props));

        let mut inner = CompFilter::new(name);
        inner.time_range = range;
        let filter = CompFilter::new(component::CALENDAR).with_nested(inner);

        Self { request, filter }
    }

    /// Returns the time range of the first nested filter, if any.
    pub fn time_range(&self) -> Option<TimeRange> {
        self.filter.nested.first().and_then(|f| f.time_range)
    }

    /// Evaluates the filter against a decoded calendar.
    pub fn matches(&self, calendar: &Component) -> bool {
        self.filter.matches(calendar)
    }
}
