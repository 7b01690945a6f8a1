//! [`CalendarTransport`] implementation for CalDAV servers.

use calredact_core::{CalendarQuery, Component};
use tracing::{debug, info};

use crate::error::{TransportError, TransportResult};
use crate::ics;
use crate::transport::{BoxFuture, CalendarInfo, CalendarObject, CalendarTransport};

use super::client::CalDavClient;
use super::config::CalDavConfig;
use super::xml;

/// CalDAV transport.
///
/// Paths passed in and returned are hrefs as the server reports them;
/// they are resolved against the configured root URL before each request.
pub struct CalDavTransport {
    client: CalDavClient,
}

impl CalDavTransport {
    /// Creates a new transport with the given configuration.
    pub fn new(config: CalDavConfig) -> TransportResult<Self> {
        Ok(Self {
            client: CalDavClient::new(config)?,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CalDavConfig {
        self.client.config()
    }

    fn url(&self, href: &str) -> String {
        self.client.config().resolve(href)
    }

    async fn propfind_href(
        &self,
        href: &str,
        body: String,
        property: &str,
        parse: fn(&str) -> TransportResult<Option<String>>,
    ) -> TransportResult<String> {
        let url = self.url(href);
        debug!(url = %url, property = %property, "Resolving via PROPFIND");

        let response = self.client.propfind(&url, &body, 0).await?;
        parse(&response)?.ok_or_else(|| {
            TransportError::invalid_response(format!("Response has no {}", property))
                .with_target(url)
        })
    }
}

impl CalendarTransport for CalDavTransport {
    fn name(&self) -> &str {
        "caldav"
    }

    fn current_user_principal(&self) -> BoxFuture<'_, TransportResult<String>> {
        Box::pin(async move {
            let body = xml::propfind_principal_body()?;
            let root = self.client.base_url().to_string();
            self.propfind_href(&root, body, "current-user-principal", xml::parse_principal)
                .await
        })
    }

    fn calendar_home_set<'a>(&'a self, principal: &'a str) -> BoxFuture<'a, TransportResult<String>> {
        Box::pin(async move {
            let body = xml::propfind_home_set_body()?;
            self.propfind_href(principal, body, "calendar-home-set", xml::parse_home_set)
                .await
        })
    }

    fn calendars<'a>(&'a self, home_set: &'a str) -> BoxFuture<'a, TransportResult<Vec<CalendarInfo>>> {
        Box::pin(async move {
            let url = self.url(home_set);
            let body = xml::propfind_calendars_body()?;
            debug!(url = %url, "Listing calendars via PROPFIND");

            let response = self.client.propfind(&url, &body, 1).await?;
            let calendars = xml::parse_calendars(&response)?;

            info!(count = calendars.len(), "Discovered calendars");
            Ok(calendars)
        })
    }

    fn query_calendar<'a>(
        &'a self,
        calendar: &'a str,
        query: &'a CalendarQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<CalendarObject>>> {
        Box::pin(async move {
            let url = self.url(calendar);
            let body = xml::calendar_query_body(query)?;
            debug!(
                calendar = %url,
                range = ?query.time_range(),
                "Querying calendar with REPORT"
            );

            let response = self.client.report(&url, &body).await?;
            let objects = xml::parse_report(&response)?;

            debug!(calendar = %url, count = objects.len(), "Received calendar objects");
            Ok(objects)
        })
    }

    fn put_calendar_object<'a>(
        &'a self,
        path: &'a str,
        calendar: &'a Component,
    ) -> BoxFuture<'a, TransportResult<CalendarObject>> {
        Box::pin(async move {
            let url = self.url(path);
            let data = ics::encode(calendar);
            debug!(url = %url, bytes = data.len(), "Storing calendar object");

            let etag = self.client.put(&url, data.clone()).await?;
            let object = CalendarObject::new(path, data.into_bytes());
            Ok(match etag {
                Some(etag) => object.with_etag(etag),
                None => object,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let config = CalDavConfig::new("https://caldav.example.com/dav/").unwrap();
        let transport = CalDavTransport::new(config).unwrap();
        assert_eq!(transport.name(), "caldav");
        assert_eq!(transport.config().url_str(), "https://caldav.example.com/dav/");
    }

    #[test]
    fn hrefs_resolve_against_root() {
        let config = CalDavConfig::new("https://caldav.example.com/dav/").unwrap();
        let transport = CalDavTransport::new(config).unwrap();
        assert_eq!(
            transport.url("/dav/calendars/alice/work/"),
            "https://caldav.example.com/dav/calendars/alice/work/"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let config = CalDavConfig::new("http://127.0.0.1:9/")
            .unwrap()
            .with_timeout(std::time::Duration::from_secs(2));
        let transport = CalDavTransport::new(config).unwrap();

        let err = transport.current_user_principal().await.unwrap_err();
        assert_eq!(err.code(), crate::TransportErrorCode::NetworkError);
        assert!(err.is_retryable());
    }
}
