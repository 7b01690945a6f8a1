//! The sync pipeline: query, decode, redact, project.
//!
//! [`SyncPipeline::run`] issues one calendar query through a
//! [`CalendarTransport`] and pushes every returned object through the
//! decoder, the [`Redactor`] and the [`EventProjector`]. Objects are
//! independent: a decode or projection failure is recorded in the
//! [`SyncReport`] and the run moves on. Transport failures abort the run.

use calredact_core::{
    CalendarQuery, Component, Diagnostic, EventProjector, EventRecord, ProjectionError,
    PropertyPolicy, Redactor,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::ics::{self, DecodeError};
use crate::transport::{CalendarObject, CalendarTransport};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The transport failed; passed through unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller asked the run to stop.
    #[error("sync cancelled")]
    Cancelled,
}

/// Why one object was skipped.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// The payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An event lacked a mandatory field.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// A per-object failure.
#[derive(Debug)]
pub struct SyncFailure {
    /// The object path.
    pub path: String,
    /// The UID of the offending event, when known.
    pub uid: Option<String>,
    /// What went wrong.
    pub error: ObjectError,
}

/// One object after redaction.
#[derive(Debug, Clone)]
pub struct SyncedObject {
    /// The object path.
    pub path: String,
    /// The object's ETag, if the transport reported one.
    pub etag: Option<String>,
    /// The redacted calendars decoded from the payload.
    pub calendars: Vec<Component>,
    /// Redaction diagnostics for this object.
    pub diagnostics: Vec<Diagnostic>,
}

/// The outcome of one run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Successfully decoded and redacted objects.
    pub objects: Vec<SyncedObject>,
    /// Projected events, in object order.
    pub records: Vec<EventRecord>,
    /// Objects or events that were skipped.
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Total number of redaction diagnostics across all objects.
    pub fn diagnostic_count(&self) -> usize {
        self.objects.iter().map(|o| o.diagnostics.len()).sum()
    }
}

/// Orchestrates transport, redaction and projection.
#[derive(Debug)]
pub struct SyncPipeline<T> {
    transport: T,
    policy: PropertyPolicy,
    projector: EventProjector,
}

impl<T: CalendarTransport> SyncPipeline<T> {
    /// Creates a pipeline.
    pub fn new(transport: T, policy: PropertyPolicy, projector: EventProjector) -> Self {
        Self {
            transport,
            policy,
            projector,
        }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the policy.
    pub fn policy(&self) -> &PropertyPolicy {
        &self.policy
    }

    /// Queries `calendar` and processes every returned object.
    ///
    /// When `cancel` is given, the transport call is raced against it and a
    /// `true` value stops the run before the next object.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] if the query fails and
    /// [`SyncError::Cancelled`] if cancellation is signalled.
    pub async fn run(
        &self,
        calendar: &str,
        query: &CalendarQuery,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> Result<SyncReport, SyncError> {
        debug!(
            transport = self.transport.name(),
            calendar = %calendar,
            range = ?query.time_range(),
            "Starting sync"
        );

        let objects = tokio::select! {
            biased;
            _ = cancelled(cancel.as_mut()) => {
                info!(calendar = %calendar, "Sync cancelled during query");
                return Err(SyncError::Cancelled);
            }
            result = self.transport.query_calendar(calendar, query) => result?,
        };

        let mut report = SyncReport::default();
        for object in objects {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                info!(calendar = %calendar, "Sync cancelled between objects");
                return Err(SyncError::Cancelled);
            }
            self.process(object, &mut report);
        }

        info!(
            calendar = %calendar,
            objects = report.objects.len(),
            records = report.records.len(),
            failures = report.failures.len(),
            diagnostics = report.diagnostic_count(),
            "Sync finished"
        );
        Ok(report)
    }

    fn process(&self, object: CalendarObject, report: &mut SyncReport) {
        let decoded = match ics::decode(&object.data) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(path = %object.path, error = %e, "Skipping undecodable object");
                report.failures.push(SyncFailure {
                    path: object.path,
                    uid: None,
                    error: e.into(),
                });
                return;
            }
        };

        let redactor = Redactor::new(&self.policy);
        let mut calendars = Vec::with_capacity(decoded.len());
        let mut diagnostics = Vec::new();

        for component in &decoded {
            let redacted = redactor.redact_with_diagnostics(component);
            diagnostics.extend(redacted.diagnostics);

            for event in redacted.component.events() {
                match self.projector.project(event) {
                    Ok(record) => report.records.push(record),
                    Err(e) => {
                        warn!(path = %object.path, error = %e, "Skipping event");
                        report.failures.push(SyncFailure {
                            path: object.path.clone(),
                            uid: event.uid().map(str::to_string),
                            error: e.into(),
                        });
                    }
                }
            }
            calendars.push(redacted.component);
        }

        report.objects.push(SyncedObject {
            path: object.path,
            etag: object.etag,
            calendars,
            diagnostics,
        });
    }

    /// Encodes `calendar` and stores it at `path`.
    ///
    /// The tree is stored as given; redact it first if it must not leak.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] if the upload fails.
    pub async fn publish(&self, path: &str, calendar: &Component) -> Result<CalendarObject, SyncError> {
        let stored = self.transport.put_calendar_object(path, calendar).await?;
        info!(path = %path, etag = ?stored.etag, "Published calendar object");
        Ok(stored)
    }
}

/// Resolves once `cancel` turns `true`; never resolves without a receiver
/// or after the sender is dropped.
async fn cancelled(cancel: Option<&mut watch::Receiver<bool>>) {
    if let Some(rx) = cancel
        && rx.wait_for(|stop| *stop).await.is_ok()
    {
        return;
    }
    std::future::pending::<()>().await
}
