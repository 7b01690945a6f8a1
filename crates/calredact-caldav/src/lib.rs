//! Calendar transports and the redaction sync pipeline.
//!
//! - [`CalendarTransport`] - the seam between the pipeline and a server
//! - [`CalDavTransport`](caldav::CalDavTransport) - CalDAV over HTTP
//! - [`MemoryTransport`] - an in-memory server for tests and demos
//! - [`ics`] - iCalendar decoding and encoding
//! - [`SyncPipeline`] - query, decode, redact, project
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  CalDAV Server  │    │     Memory      │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ CalDavTransport │    │ MemoryTransport │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │  CalendarTransport   │
//!          └──────────┬───────────┘
//!                     │ CalendarObject
//!                     ▼ ics::decode()
//!              ┌─────────────┐
//!              │  Component  │
//!              └──────┬──────┘
//!                     ▼ Redactor
//!              ┌─────────────┐
//!              │  Component  │
//!              └──────┬──────┘
//!                     ▼ EventProjector
//!              ┌─────────────┐
//!              │ EventRecord │
//!              └─────────────┘
//! ```

#[cfg(feature = "caldav")]
pub mod caldav;
pub mod error;
pub mod ics;
pub mod memory;
pub mod sync;
pub mod transport;

pub use error::{TransportError, TransportErrorCode, TransportResult};
pub use ics::{DecodeError, decode, encode};
pub use memory::MemoryTransport;
pub use sync::{ObjectError, SyncError, SyncFailure, SyncPipeline, SyncReport, SyncedObject};
pub use transport::{BoxFuture, CalendarInfo, CalendarObject, CalendarTransport};
