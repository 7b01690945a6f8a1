//! Test event creation.

use calredact_caldav::{CalendarTransport, SyncPipeline, ics};
use calredact_core::component::{ALARM, CALENDAR, EVENT};
use calredact_core::time::{format_duration, format_utc};
use calredact_core::{Component, Prop};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::Discovery;
use crate::error::CliResult;

/// `PRODID` written on created objects.
pub const PRODUCT_ID: &str = concat!("-//calredact//calredact ", env!("CARGO_PKG_VERSION"), "//EN");

/// Options for the event to create.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub uid: String,
    pub summary: String,
    pub sender_id: String,
    pub now: DateTime<Utc>,
}

impl NewEvent {
    /// An event with a fresh random UID, created now.
    pub fn new(summary: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            summary: summary.into(),
            sender_id: sender_id.into(),
            now: Utc::now(),
        }
    }

    /// Builds the `VCALENDAR` holding one confirmed event that starts in an
    /// hour, lasts an hour and carries a display alarm 58 minutes before.
    pub fn to_calendar(&self) -> Component {
        let stamp = format_utc(self.now);

        let alarm = Component::new(ALARM)
            .with_text("ACTION", "DISPLAY")
            .with_text("DESCRIPTION", self.summary.clone())
            .with_text("TRIGGER", format_duration(Duration::minutes(-58)));

        let event = Component::new(EVENT)
            .with_text("CREATED", stamp.clone())
            .with_text("DTSTAMP", stamp.clone())
            .with_text("LAST-MODIFIED", stamp)
            .with_text("SEQUENCE", "1")
            .with_text("UID", self.uid.clone())
            .with_text("DTSTART", format_utc(self.now + Duration::hours(1)))
            .with_text("DTEND", format_utc(self.now + Duration::hours(2)))
            .with_text("STATUS", "CONFIRMED")
            .with_text("SUMMARY", self.summary.clone())
            .with_text("TRANSP", "OPAQUE")
            .with_text("CLASS", "PUBLIC")
            .with_prop(Prop::new("X-PROTEI-SENDERID", self.sender_id.clone()))
            .with_child(alarm);

        Component::new(CALENDAR)
            .with_text("VERSION", "2.0")
            .with_text("PRODID", PRODUCT_ID)
            .with_text("CALSCALE", "GREGORIAN")
            .with_child(event)
    }

    /// The object path under `calendar`.
    pub fn path_in(&self, calendar: &str) -> String {
        format!("{}/{}.ics", calendar.trim_end_matches('/'), self.uid)
    }
}

/// Print the calendar object for `event`.
pub fn dry_run(event: &NewEvent) -> CliResult<()> {
    print!("{}", ics::encode(&event.to_calendar()));
    Ok(())
}

/// Store `event` in the selected calendar and return its path.
pub async fn run<T: CalendarTransport>(
    pipeline: &SyncPipeline<T>,
    selector: Option<&str>,
    event: &NewEvent,
) -> CliResult<String> {
    let discovery = Discovery::run(pipeline.transport()).await?;
    let calendar = discovery.select(selector)?;
    let path = event.path_in(&calendar.path);

    let stored = pipeline.publish(&path, &event.to_calendar()).await?;
    match stored.etag {
        Some(ref etag) => println!("created {} (etag {})", stored.path, etag),
        None => println!("created {}", stored.path),
    }
    Ok(stored.path)
}
