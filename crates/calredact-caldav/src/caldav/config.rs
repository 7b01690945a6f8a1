//! CalDAV transport configuration.

use std::time::Duration;
use url::Url;

/// Connection settings for [`CalDavTransport`](super::CalDavTransport).
#[derive(Debug, Clone)]
pub struct CalDavConfig {
    /// Server root. Always ends with `/` so relative hrefs land below it.
    pub url: Url,

    /// Basic auth user.
    pub username: Option<String>,

    /// Basic auth password.
    pub password: Option<String>,

    /// Reject invalid TLS certificates.
    pub verify_tls: bool,

    /// Per-request timeout.
    pub timeout: Duration,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl CalDavConfig {
    /// Request timeout used unless overridden.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Parses the server root.
    ///
    /// # Errors
    ///
    /// Returns the parse error for a malformed URL.
    pub fn new(root: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(root.as_ref())?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            url,
            username: None,
            password: None,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calredact/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Builder method to attach Basic auth credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Builder method to accept any certificate. Only for test servers.
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Builder method to change the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to change the `User-Agent`.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// The server root as text.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// True when both user and password are set.
    pub fn has_credentials(&self) -> bool {
        matches!((&self.username, &self.password), (Some(_), Some(_)))
    }

    /// Turns an href from a multistatus response (absolute URL, absolute
    /// path or relative path) into a request URL.
    pub fn resolve(&self, href: &str) -> String {
        match Url::parse(href) {
            Ok(absolute) => absolute.to_string(),
            Err(_) => self
                .url
                .join(href)
                .map(String::from)
                .unwrap_or_else(|_| href.to_string()),
        }
    }
}
