//! Discovery command.

use calredact_caldav::CalendarTransport;

use super::Discovery;
use crate::error::CliResult;

/// Print the principal, home set and numbered calendars.
pub async fn run<T: CalendarTransport>(transport: &T) -> CliResult<()> {
    let discovery = Discovery::run(transport).await?;
    print!("{}", render(&discovery));
    Ok(())
}

/// Renders a discovery result; the indices are valid `--calendar` values.
pub fn render(discovery: &Discovery) -> String {
    let mut out = format!(
        "principal: {}\nhome set: {}\n",
        discovery.principal, discovery.home_set
    );
    if discovery.calendars.is_empty() {
        out.push_str("Calendars not found\n");
        return out;
    }
    for (i, calendar) in discovery.calendars.iter().enumerate() {
        out.push_str(&format!("cal {}: {} {}", i, calendar.display_name(), calendar.path));
        if !calendar.components.is_empty() {
            out.push_str(&format!(" [{}]", calendar.components.join(",")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;

    #[tokio::test]
    async fn render_lists_calendars() {
        let discovery = Discovery::run(&testing::server()).await.unwrap();
        insta::assert_snapshot!(render(&discovery).trim_end(), @r"
        principal: /user/
        home set: /user/calendars/
        cal 0: Work /user/calendars/a/
        cal 1: /user/calendars/b/ /user/calendars/b/ [VTODO]
        ");
    }

    #[tokio::test]
    async fn render_without_calendars() {
        let discovery = Discovery::run(&calredact_caldav::MemoryTransport::new())
            .await
            .unwrap();
        assert!(render(&discovery).ends_with("Calendars not found\n"));
    }
}
