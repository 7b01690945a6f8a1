//! Core types: component tree, redaction policy, query filters, event projection.
//!
//! - [`Component`] / [`Prop`] - an owned iCalendar component tree
//! - [`PropertyPolicy`] - immutable keep/redact decisions per property name
//! - [`Redactor`] - recursive tree sanitizer
//! - [`CalendarQuery`] - calendar-query request and filter model
//! - [`EventProjector`] - flattens events into [`EventRecord`]s

pub mod component;
pub mod policy;
pub mod project;
pub mod property;
pub mod query;
pub mod redact;
pub mod time;
pub mod tracing;

pub use component::{Component, Prop};
pub use policy::{Disposition, MailboxUidRule, PolicyBuilder, PropertyPolicy};
pub use project::{EventProjector, EventRecord, FieldProblem, ProjectionError};
pub use property::PropertyName;
pub use query::{CalendarQuery, CompFilter, CompRequest, DEFAULT_EVENT_PROPS};
pub use redact::{Diagnostic, Redacted, Redactor, redact};
pub use time::{TimeError, TimeRange, ZoneHint};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
