//! Typed iCalendar property names.
//!
//! [`PropertyName`] enumerates the RFC 5545 properties (and the handful of
//! vendor extensions seen in the wild) that a redaction policy can talk
//! about. Anything else is carried as [`PropertyName::Unrecognized`] so that
//! lookups stay total while unknown extension properties are still tolerated.
//!
//! Names are matched case-sensitively against the exact tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! property_names {
    ($($variant:ident => $token:literal,)+) => {
        /// A property name, either a well-known token or an unrecognized one.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum PropertyName {
            $(
                #[doc = concat!("`", $token, "`")]
                $variant,
            )+
            /// Any token not listed above, kept verbatim.
            Unrecognized(String),
        }

        impl PropertyName {
            /// Every well-known property name, in declaration order.
            pub const KNOWN: &'static [PropertyName] = &[$(PropertyName::$variant,)+];

            /// Returns the wire token for this property.
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $token,)+
                    Self::Unrecognized(name) => name.as_str(),
                }
            }

            /// Parses a wire token. Never fails.
            pub fn parse(token: &str) -> Self {
                match token {
                    $($token => Self::$variant,)+
                    other => Self::Unrecognized(other.to_string()),
                }
            }
        }
    };
}

property_names! {
    // Calendar properties
    CalScale => "CALSCALE",
    Method => "METHOD",
    ProductId => "PRODID",
    Version => "VERSION",
    // Descriptive
    Attach => "ATTACH",
    Categories => "CATEGORIES",
    Class => "CLASS",
    Comment => "COMMENT",
    Description => "DESCRIPTION",
    Geo => "GEO",
    Location => "LOCATION",
    PercentComplete => "PERCENT-COMPLETE",
    Priority => "PRIORITY",
    Resources => "RESOURCES",
    Status => "STATUS",
    Summary => "SUMMARY",
    // Date and time
    Completed => "COMPLETED",
    DateTimeEnd => "DTEND",
    Due => "DUE",
    DateTimeStart => "DTSTART",
    Duration => "DURATION",
    FreeBusy => "FREEBUSY",
    Transparency => "TRANSP",
    // Time zone
    TimezoneId => "TZID",
    TimezoneName => "TZNAME",
    TimezoneOffsetFrom => "TZOFFSETFROM",
    TimezoneOffsetTo => "TZOFFSETTO",
    TimezoneUrl => "TZURL",
    // Relationship
    Attendee => "ATTENDEE",
    Contact => "CONTACT",
    Organizer => "ORGANIZER",
    RecurrenceId => "RECURRENCE-ID",
    RelatedTo => "RELATED-TO",
    Url => "URL",
    Uid => "UID",
    // Recurrence
    ExceptionDates => "EXDATE",
    RecurrenceDates => "RDATE",
    RecurrenceRule => "RRULE",
    // Alarm
    Action => "ACTION",
    Repeat => "REPEAT",
    Trigger => "TRIGGER",
    // Change management
    Created => "CREATED",
    DateTimeStamp => "DTSTAMP",
    LastModified => "LAST-MODIFIED",
    Sequence => "SEQUENCE",
    // Miscellaneous
    RequestStatus => "REQUEST-STATUS",
    // RFC 9074
    Acknowledged => "ACKNOWLEDGED",
    // Vendor extensions
    MozLastAck => "X-MOZ-LASTACK",
    MozGeneration => "X-MOZ-GENERATION",
    SenderId => "X-PROTEI-SENDERID",
}

impl PropertyName {
    /// Returns true if this is one of the well-known names.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PropertyName {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for PropertyName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(Self::parse(&token))
    }
}
