//! CLI configuration, loaded from `config.toml`.
//!
//! ```toml
//! [caldav]
//! url = "https://caldav.example.com/dav/"
//! username = "alice"
//!
//! [query]
//! calendar = "0"
//! time_range = true
//! lookbehind_hours = 92
//!
//! [policy]
//! redact = ["DESCRIPTION"]
//! mailbox_uids = "drop"
//!
//! [projection]
//! timezone = "Europe/Paris"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use calredact_caldav::caldav::CalDavConfig;
use calredact_core::component::EVENT;
use calredact_core::{
    CalendarQuery, DEFAULT_EVENT_PROPS, MailboxUidRule, PolicyBuilder, PropertyName,
    PropertyPolicy, TimeRange, ZoneHint,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server connection.
    pub caldav: CalDavSettings,
    /// What to fetch.
    pub query: QuerySettings,
    /// What to keep.
    pub policy: PolicySettings,
    /// How to read times.
    pub projection: ProjectionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalDavSettings {
    /// Root URL of the server.
    pub url: Option<String>,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Verify TLS certificates.
    pub verify_tls: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CalDavSettings {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            verify_tls: true,
            timeout_secs: CalDavConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Calendar selector: an index into the discovered list or a path.
    pub calendar: Option<String>,
    /// Bound the query around the current time.
    pub time_range: bool,
    /// Hours before now covered by the time range.
    pub lookbehind_hours: u32,
    /// Hours after now covered by the time range.
    pub lookahead_hours: u32,
    /// Properties requested on top of the default event set.
    pub extra_props: Vec<String>,
}

impl QuerySettings {
    /// Upper bound for either side of the time range, roughly a century.
    pub const MAX_WINDOW_HOURS: u32 = 24 * 366 * 100;
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            calendar: None,
            time_range: false,
            lookbehind_hours: 92,
            lookahead_hours: 24,
            extra_props: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Start from the built-in policy.
    pub standard: bool,
    /// Properties to keep, on top of the base.
    pub keep: Vec<String>,
    /// Properties to redact, on top of the base.
    pub redact: Vec<String>,
    /// Treatment of mailbox-style UIDs.
    pub mailbox_uids: MailboxUidRule,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            standard: true,
            keep: Vec::new(),
            redact: Vec::new(),
            mailbox_uids: MailboxUidRule::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Zone for floating times: `local`, `utc` or an IANA name.
    pub timezone: String,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            timezone: "local".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calredact")
    }

    /// Applies connection values given on the command line or through the
    /// environment. Present values win over the file.
    pub fn apply_overrides(
        &mut self,
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) {
        if url.is_some() {
            self.caldav.url = url;
        }
        if username.is_some() {
            self.caldav.username = username;
        }
        if password.is_some() {
            self.caldav.password = password;
        }
    }

    /// Checks every section without contacting the server.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.caldav.url {
            CalDavConfig::new(url).map_err(|e| format!("invalid caldav.url {:?}: {}", url, e))?;
        }
        if self.caldav.timeout_secs == 0 {
            return Err("caldav.timeout_secs must be positive".to_string());
        }
        self.query.check_window()?;
        self.projection.zone()?;
        self.policy.check_conflicts()
    }
}

impl CalDavSettings {
    /// Builds the transport configuration.
    pub fn to_transport_config(&self) -> Result<CalDavConfig, String> {
        let url = self
            .url
            .as_deref()
            .ok_or("caldav.url is not set (use --url or CALDAV_ROOT)")?;
        let mut config = CalDavConfig::new(url)
            .map_err(|e| format!("invalid caldav.url {:?}: {}", url, e))?
            .with_timeout(Duration::from_secs(self.timeout_secs));

        match (&self.username, &self.password) {
            (Some(user), Some(password)) => config = config.with_credentials(user, password),
            (Some(_), None) => {
                return Err("caldav.password is not set (use --password or CALDAV_PASSWORD)".into());
            }
            _ => {}
        }
        if !self.verify_tls {
            config = config.with_insecure_tls();
        }
        Ok(config)
    }
}

impl QuerySettings {
    /// Builds the event query, bounded around `now` when enabled.
    pub fn to_query(&self, now: DateTime<Utc>) -> Result<CalendarQuery, String> {
        let range = if self.time_range {
            self.check_window()?;
            let range = TimeRange::around(
                now,
                chrono::Duration::hours(i64::from(self.lookbehind_hours)),
                chrono::Duration::hours(i64::from(self.lookahead_hours)),
            )
            .map_err(|e| format!("invalid query time range: {}", e))?;
            Some(range)
        } else {
            None
        };

        let props = DEFAULT_EVENT_PROPS
            .iter()
            .map(|p| p.to_string())
            .chain(self.extra_props.iter().map(|p| p.to_ascii_uppercase()));
        Ok(CalendarQuery::for_component(EVENT, props, range))
    }

    fn check_window(&self) -> Result<(), String> {
        for (key, hours) in [
            ("lookbehind_hours", self.lookbehind_hours),
            ("lookahead_hours", self.lookahead_hours),
        ] {
            if hours > Self::MAX_WINDOW_HOURS {
                return Err(format!(
                    "query.{} must be at most {}, got {}",
                    key,
                    Self::MAX_WINDOW_HOURS,
                    hours
                ));
            }
        }
        Ok(())
    }
}

impl PolicySettings {
    /// Builds the property policy.
    pub fn to_policy(&self) -> PropertyPolicy {
        let base = if self.standard {
            PolicyBuilder::standard()
        } else {
            PropertyPolicy::builder()
        };
        base.keep_all(self.keep.iter().map(String::as_str))
            .redact_all(self.redact.iter().map(String::as_str))
            .mailbox_uids(self.mailbox_uids)
            .build()
    }

    fn check_conflicts(&self) -> Result<(), String> {
        let keep: HashSet<PropertyName> = self.keep.iter().map(|n| PropertyName::parse(n)).collect();
        match self.redact.iter().find(|n| keep.contains(&PropertyName::parse(n))) {
            Some(name) => Err(format!("policy lists {} as both kept and redacted", name)),
            None => Ok(()),
        }
    }
}

impl ProjectionSettings {
    /// Parses the configured zone.
    pub fn zone(&self) -> Result<ZoneHint, String> {
        ZoneHint::parse(&self.timezone)
            .ok_or_else(|| format!("unknown projection.timezone {:?}", self.timezone))
    }
}
