//! Sync command.

use calredact_caldav::{CalendarTransport, SyncPipeline, SyncReport};
use calredact_core::{CalendarQuery, Diagnostic, EventRecord};
use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use super::Discovery;
use crate::error::{CliError, CliResult};

/// Select a calendar, run the pipeline against it and print the records.
pub async fn run<T: CalendarTransport>(
    pipeline: &SyncPipeline<T>,
    selector: Option<&str>,
    query: &CalendarQuery,
    json: bool,
    cancel: watch::Receiver<bool>,
) -> CliResult<()> {
    let discovery = Discovery::run(pipeline.transport()).await?;
    let calendar = discovery.select(selector)?;
    info!(calendar = %calendar.path, name = calendar.display_name(), "Syncing calendar");

    let report = pipeline.run(&calendar.path, query, Some(cancel)).await?;
    let output = if json {
        render_json(&calendar.path, &report)?
    } else {
        render_text(&report)
    };
    println!("{}", output);
    Ok(())
}

/// One record block per event, then the skipped objects and a summary.
pub fn render_text(report: &SyncReport) -> String {
    let mut out = String::new();
    for record in &report.records {
        out.push_str(&format!("\n{}\n", record));
    }
    if !report.failures.is_empty() {
        out.push('\n');
        for failure in &report.failures {
            out.push_str(&format!("skipped {}: {}\n", failure.path, failure.error));
        }
    }
    out.push_str(&format!(
        "\n{} events, {} skipped, {} properties dropped",
        report.records.len(),
        report.failures.len(),
        report.diagnostic_count()
    ));
    out
}

#[derive(Serialize)]
struct SyncOutput<'a> {
    calendar: &'a str,
    records: &'a [EventRecord],
    failures: Vec<FailureOutput<'a>>,
    diagnostics: Vec<&'a Diagnostic>,
}

#[derive(Serialize)]
struct FailureOutput<'a> {
    path: &'a str,
    uid: Option<&'a str>,
    error: String,
}

/// Renders the report as a JSON document.
pub fn render_json(calendar: &str, report: &SyncReport) -> CliResult<String> {
    let output = SyncOutput {
        calendar,
        records: &report.records,
        failures: report
            .failures
            .iter()
            .map(|f| FailureOutput {
                path: &f.path,
                uid: f.uid.as_deref(),
                error: f.error.to_string(),
            })
            .collect(),
        diagnostics: report.objects.iter().flat_map(|o| &o.diagnostics).collect(),
    };
    serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::Output(format!("failed to serialize records: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use calredact_core::{EventProjector, PropertyPolicy, ZoneHint};

    async fn report() -> SyncReport {
        let pipeline = SyncPipeline::new(
            testing::server(),
            PropertyPolicy::standard(),
            EventProjector::new(ZoneHint::Utc),
        );
        pipeline
            .run("/user/calendars/a/", &CalendarQuery::events(None), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn text_output() {
        let text = render_text(&report().await);

        assert!(text.contains("UID: 1234-5678"));
        assert!(text.contains("SUMMARY: Standup"));
        assert!(!text.contains("boss@example.com"));
        assert!(text.contains(
            "skipped /user/calendars/a/broken.ics: DTSTART is missing (uid: broken)\n"
        ));
        assert!(text.ends_with("1 events, 1 skipped, 0 properties dropped"));
    }

    #[tokio::test]
    async fn json_output() {
        let json = render_json("/user/calendars/a/", &report().await).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["calendar"], "/user/calendars/a/");
        assert_eq!(value["records"][0]["uid"], "1234-5678");
        assert_eq!(value["records"][0]["summary"], "Standup");
        assert_eq!(value["records"][0]["start"], "2024-01-10T10:00:00Z");
        assert_eq!(value["failures"][0]["uid"], "broken");
        assert_eq!(value["diagnostics"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn selection_and_cancellation() {
        let pipeline = SyncPipeline::new(
            testing::server(),
            PropertyPolicy::standard(),
            EventProjector::new(ZoneHint::Utc),
        );
        let (tx, rx) = watch::channel(false);

        let err = run(&pipeline, Some("9"), &CalendarQuery::events(None), false, rx.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Selection(_)));

        tx.send(true).unwrap();
        let err = run(&pipeline, None, &CalendarQuery::events(None), false, rx)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Cancelled));
    }
}
