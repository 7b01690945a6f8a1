//! HTTP client for CalDAV operations.
//!
//! Wraps `reqwest` with the WebDAV verbs the transport needs and maps HTTP
//! statuses onto [`TransportError`] codes.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, trace, warn};

use crate::error::{TransportError, TransportResult};

use super::auth::basic_auth;
use super::config::CalDavConfig;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// HTTP client for CalDAV operations.
pub struct CalDavClient {
    client: Client,
    config: CalDavConfig,
}

impl CalDavClient {
    /// Creates a new CalDAV client with the given configuration.
    pub fn new(config: CalDavConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                TransportError::configuration(format!("Failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self { client, config })
    }

    /// Performs a PROPFIND request and returns the multistatus body.
    pub async fn propfind(&self, url: &str, body: &str, depth: u8) -> TransportResult<String> {
        let method = dav_method("PROPFIND")?;
        let request = self
            .request(method, url)
            .header("Content-Type", XML_CONTENT_TYPE)
            .header("Depth", depth.to_string())
            .body(body.to_string());
        self.text(self.send("PROPFIND", url, request).await?, url).await
    }

    /// Performs a REPORT request (Depth 1) and returns the multistatus body.
    pub async fn report(&self, url: &str, body: &str) -> TransportResult<String> {
        let method = dav_method("REPORT")?;
        let request = self
            .request(method, url)
            .header("Content-Type", XML_CONTENT_TYPE)
            .header("Depth", "1")
            .body(body.to_string());
        self.text(self.send("REPORT", url, request).await?, url).await
    }

    /// Stores an iCalendar object and returns the new ETag, if the server
    /// sent one.
    pub async fn put(&self, url: &str, body: String) -> TransportResult<Option<String>> {
        let request = self
            .request(Method::PUT, url)
            .header("Content-Type", ICS_CONTENT_TYPE)
            .body(body);
        let response = self.send("PUT", url, request).await?;

        Ok(response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string()))
    }

    /// Starts a request, attaching credentials when configured.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match (&self.config.username, &self.config.password) {
            (Some(username), Some(password)) => {
                request.header("Authorization", basic_auth(username, password))
            }
            _ => request,
        }
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> TransportResult<Response> {
        trace!(method = %method, url = %url, "Sending request");

        let response = request.send().await.map_err(|e| {
            TransportError::network(format!("Request failed: {}", e))
                .with_target(url)
                .with_source(e)
        })?;

        debug!(method = %method, url = %url, status = %response.status(), "Received response");
        check_status(response, url).await
    }

    async fn text(&self, response: Response, url: &str) -> TransportResult<String> {
        response.text().await.map_err(|e| {
            TransportError::network(format!("Failed to read response: {}", e))
                .with_target(url)
                .with_source(e)
        })
    }

    /// Returns the root URL from the configuration.
    pub fn base_url(&self) -> &str {
        self.config.url_str()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CalDavConfig {
        &self.config
    }
}

fn dav_method(name: &str) -> TransportResult<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|_| TransportError::internal(format!("Invalid HTTP method: {}", name)))
}

/// Passes successful responses through and maps everything else to an error.
async fn check_status(response: Response, url: &str) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::UNAUTHORIZED => {
            TransportError::authentication("Authentication failed: invalid credentials")
        }
        StatusCode::FORBIDDEN => TransportError::authorization("Access denied to resource"),
        StatusCode::NOT_FOUND => TransportError::not_found("Calendar or resource not found"),
        StatusCode::TOO_MANY_REQUESTS => {
            TransportError::rate_limited("Too many requests to server")
        }
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            TransportError::server(format!("Server error ({}): {}", s, body))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            TransportError::invalid_response(format!("Unexpected status {}: {}", s, body))
        }
    };

    Err(err.with_target(url))
}
