//! Projection of event components into flat records.
//!
//! [`EventProjector`] pulls a fixed set of well-known properties out of a
//! `VEVENT` into an [`EventRecord`]. Identifier and timestamps are
//! mandatory; everything else is optional and always present in the record
//! as `None` rather than omitted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::Component;
use crate::time::{TimeError, ZoneHint, offset, parse_date_time, parse_duration};

/// Why a mandatory field could not be projected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    /// The property is absent.
    Missing,
    /// The property is present but its value does not parse.
    Unparsable(TimeError),
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Unparsable(e) => write!(f, "unparsable: {e}"),
        }
    }
}

/// Errors from [`EventProjector::project`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// A mandatory property is absent or malformed.
    #[error("{field} is {problem} (uid: {})", .uid.as_deref().unwrap_or("-"))]
    MissingOrUnparsableField {
        /// The offending property name.
        field: &'static str,
        /// The component's UID, when it has one.
        uid: Option<String>,
        /// What went wrong.
        problem: FieldProblem,
    },
}

impl ProjectionError {
    /// The offending property name.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingOrUnparsableField { field, .. } => *field,
        }
    }
}

/// A flat view of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// `UID`
    pub uid: String,
    /// `SUMMARY`
    pub summary: Option<String>,
    /// `DESCRIPTION`
    pub description: Option<String>,
    /// `STATUS`, raw.
    pub status: Option<String>,
    /// `CLASS`, raw.
    pub class: Option<String>,
    /// `TRANSP`, raw.
    pub transparency: Option<String>,
    /// `SEQUENCE`, raw.
    pub sequence: Option<String>,
    /// `CREATED`
    pub created: DateTime<Utc>,
    /// `DTSTART`
    pub start: DateTime<Utc>,
    /// `DTEND`, or `DTSTART + DURATION`.
    pub end: DateTime<Utc>,
    /// `DTSTAMP`
    pub stamp: DateTime<Utc>,
    /// `LAST-MODIFIED`
    pub last_modified: DateTime<Utc>,
    /// `X-PROTEI-SENDERID`
    pub sender_id: Option<String>,
    /// `URL`
    pub url: Option<String>,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        writeln!(f, "CLASS: {}", opt(&self.class))?;
        writeln!(f, "STATUS: {}", opt(&self.status))?;
        writeln!(f, "UID: {}", self.uid)?;
        writeln!(f, "SUMMARY: {}", opt(&self.summary))?;
        writeln!(f, "DESCRIPTION: {}", opt(&self.description))?;
        writeln!(f, "URL: {}", opt(&self.url))?;
        writeln!(f, "CREATED: {}", self.created)?;
        writeln!(f, "DTSTART: {}", self.start)?;
        writeln!(f, "DTEND: {}", self.end)?;
        writeln!(f, "DTSTAMP: {}", self.stamp)?;
        writeln!(f, "LAST-MODIFIED: {}", self.last_modified)?;
        writeln!(f, "SEQUENCE: {}", opt(&self.sequence))?;
        writeln!(f, "TRANSP: {}", opt(&self.transparency))?;
        write!(f, "X-PROTEI-SENDERID: {}", opt(&self.sender_id))
    }
}

/// Builds [`EventRecord`]s from event components.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventProjector {
    zone: ZoneHint,
}

impl EventProjector {
    /// Creates a projector resolving floating times in `zone`.
    pub fn new(zone: ZoneHint) -> Self {
        Self { zone }
    }

    /// The zone used for floating times.
    pub fn zone(&self) -> ZoneHint {
        self.zone
    }

    /// Projects a component.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::MissingOrUnparsableField`] naming the first
    /// mandatory property (UID, DTSTART, DTEND, CREATED, DTSTAMP,
    /// LAST-MODIFIED) that is absent or does not parse.
    pub fn project(&self, component: &Component) -> Result<EventRecord, ProjectionError> {
        let uid = component.uid().map(str::to_string);
        let fail = |field: &'static str, problem: FieldProblem| {
            ProjectionError::MissingOrUnparsableField {
                field,
                uid: uid.clone(),
                problem,
            }
        };

        let instant = |field: &'static str| -> Result<DateTime<Utc>, ProjectionError> {
            let prop = component
                .prop(field)
                .ok_or_else(|| fail(field, FieldProblem::Missing))?;
            parse_date_time(prop, self.zone).map_err(|e| fail(field, FieldProblem::Unparsable(e)))
        };

        let id = uid.clone().ok_or_else(|| fail("UID", FieldProblem::Missing))?;
        let start = instant("DTSTART")?;
        let end = match (component.prop("DTEND"), component.value("DURATION")) {
            (None, Some(duration)) => parse_duration(duration)
                .and_then(|d| offset(start, d))
                .map_err(|e| fail("DURATION", FieldProblem::Unparsable(e)))?,
            _ => instant("DTEND")?,
        };
        let created = instant("CREATED")?;
        let stamp = instant("DTSTAMP")?;
        let last_modified = instant("LAST-MODIFIED")?;

        let text = |name: &str| component.value(name).map(str::to_string);

        Ok(EventRecord {
            uid: id,
            summary: text("SUMMARY"),
            description: text("DESCRIPTION"),
            status: text("STATUS"),
            class: text("CLASS"),
            transparency: text("TRANSP"),
            sequence: text("SEQUENCE"),
            created,
            start,
            end,
            stamp,
            last_modified,
            sender_id: text("X-PROTEI-SENDERID"),
            url: text("URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{EVENT, Prop};
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn full_event() -> Component {
        Component::new(EVENT)
            .with_text("UID", "1234-5678")
            .with_text("SUMMARY", "Standup")
            .with_text("DTSTART", "20240110T100000Z")
            .with_text("DTEND", "20240110T110000Z")
            .with_text("CREATED", "20240101T080000Z")
            .with_text("DTSTAMP", "20240101T080000Z")
            .with_text("LAST-MODIFIED", "20240102T090000Z")
            .with_text("SEQUENCE", "1")
            .with_text("STATUS", "CONFIRMED")
            .with_text("TRANSP", "OPAQUE")
            .with_text("CLASS", "PUBLIC")
            .with_text("X-PROTEI-SENDERID", "12345")
    }

    fn projector() -> EventProjector {
        EventProjector::new(ZoneHint::Utc)
    }

    #[test]
    fn projects_full_event() {
        let record = projector().project(&full_event()).unwrap();

        assert_eq!(record.uid, "1234-5678");
        assert_eq!(record.summary.as_deref(), Some("Standup"));
        assert_eq!(record.start, utc(2024, 1, 10, 10, 0));
        assert_eq!(record.end, utc(2024, 1, 10, 11, 0));
        assert_eq!(record.last_modified, utc(2024, 1, 2, 9, 0));
        assert_eq!(record.sequence.as_deref(), Some("1"));
        assert_eq!(record.sender_id.as_deref(), Some("12345"));
        assert!(record.description.is_none());
        assert!(record.url.is_none());
    }

    #[test]
    fn missing_dtstart_is_named() {
        let mut event = full_event();
        event.properties.shift_remove("DTSTART");

        let err = projector().project(&event).unwrap_err();

        assert_eq!(err.field(), "DTSTART");
        assert_eq!(
            err,
            ProjectionError::MissingOrUnparsableField {
                field: "DTSTART",
                uid: Some("1234-5678".to_string()),
                problem: FieldProblem::Missing,
            }
        );
        assert_eq!(err.to_string(), "DTSTART is missing (uid: 1234-5678)");
    }

    #[test]
    fn missing_uid_is_named() {
        let mut event = full_event();
        event.properties.shift_remove("UID");
        let err = projector().project(&event).unwrap_err();
        assert_eq!(err.field(), "UID");
        assert_eq!(err.to_string(), "UID is missing (uid: -)");
    }

    #[test]
    fn unparsable_timestamp_is_named() {
        let mut event = full_event();
        event.set_text("LAST-MODIFIED", "yesterday");
        let err = projector().project(&event).unwrap_err();
        assert_eq!(err.field(), "LAST-MODIFIED");
        assert!(err.to_string().contains("unparsable"));
    }

    #[test]
    fn duration_stands_in_for_dtend() {
        let mut event = full_event();
        event.properties.shift_remove("DTEND");
        event.set_text("DURATION", "PT45M");
        let record = projector().project(&event).unwrap();
        assert_eq!(record.end, utc(2024, 1, 10, 10, 45));
    }

    #[test]
    fn oversized_duration_is_unparsable() {
        for value in ["P999999999D", "P99999999999999W"] {
            let mut event = full_event();
            event.properties.shift_remove("DTEND");
            event.set_text("DURATION", value);

            let err = projector().project(&event).unwrap_err();
            assert_eq!(err.field(), "DURATION");
            assert!(err.to_string().starts_with("DURATION is unparsable"));
        }
    }

    #[test]
    fn zone_aware_start() {
        let mut event = full_event();
        event.set_prop(Prop::new("DTSTART", "20240110T100000").with_param("TZID", "Europe/Paris"));
        let record = projector().project(&event).unwrap();
        assert_eq!(record.start, utc(2024, 1, 10, 9, 0));
    }

    #[test]
    fn optional_fields_serialize_as_null() {
        let mut event = full_event();
        for name in ["SUMMARY", "SEQUENCE", "STATUS", "TRANSP", "CLASS", "X-PROTEI-SENDERID"] {
            event.properties.shift_remove(name);
        }
        let record = projector().project(&event).unwrap();

        insta::assert_json_snapshot!(record, @r#"
        {
          "uid": "1234-5678",
          "summary": null,
          "description": null,
          "status": null,
          "class": null,
          "transparency": null,
          "sequence": null,
          "created": "2024-01-01T08:00:00Z",
          "start": "2024-01-10T10:00:00Z",
          "end": "2024-01-10T11:00:00Z",
          "stamp": "2024-01-01T08:00:00Z",
          "last_modified": "2024-01-02T09:00:00Z",
          "sender_id": null,
          "url": null
        }
        "#);
    }

    #[test]
    fn display_lists_every_field() {
        let text = projector().project(&full_event()).unwrap().to_string();
        assert!(text.starts_with("CLASS: PUBLIC\n"));
        assert!(text.contains("DTSTART: 2024-01-10 10:00:00 UTC"));
        assert!(text.contains("URL: \n"));
        assert!(text.ends_with("X-PROTEI-SENDERID: 12345"));
    }
}
