//! Redaction policy.
//!
//! A [`PropertyPolicy`] decides, per property name, whether the property is
//! kept or redacted. It is built once through [`PolicyBuilder`] and is
//! read-only afterwards, so a single instance can be shared by reference
//! across every redaction call of a run.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::property::PropertyName;

/// What to do with a property the policy knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Copy every occurrence unchanged.
    Keep,
    /// Drop the property entirely.
    Redact,
}

/// How to treat a kept `UID` whose value looks like a mailbox (`x@y`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxUidRule {
    /// Copy the UID like any other kept property.
    #[default]
    Keep,
    /// Drop the whole UID property.
    Drop,
}

/// Immutable mapping from property name to [`Disposition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPolicy {
    rules: HashMap<PropertyName, Disposition>,
    mailbox_uids: MailboxUidRule,
}

impl PropertyPolicy {
    /// Starts an empty policy.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// The built-in policy: descriptive, scheduling and change-management
    /// properties are kept; anything that identifies people, places or
    /// attachments is redacted.
    pub fn standard() -> Self {
        PolicyBuilder::standard().build()
    }

    /// Looks up a property by its wire token. `None` means the policy has
    /// never heard of it.
    pub fn disposition(&self, name: &str) -> Option<Disposition> {
        self.disposition_of(&PropertyName::parse(name))
    }

    /// Looks up a typed property name.
    pub fn disposition_of(&self, name: &PropertyName) -> Option<Disposition> {
        self.rules.get(name).copied()
    }

    /// Returns true if the property is explicitly kept.
    pub fn keeps(&self, name: &str) -> bool {
        self.disposition(name) == Some(Disposition::Keep)
    }

    /// The rule applied to mailbox-style UIDs.
    pub fn mailbox_uids(&self) -> MailboxUidRule {
        self.mailbox_uids
    }

    /// Number of properties the policy covers.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the policy covers no property at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates the kept property names, sorted.
    pub fn kept(&self) -> Vec<&PropertyName> {
        self.names_with(Disposition::Keep)
    }

    /// Iterates the redacted property names, sorted.
    pub fn redacted(&self) -> Vec<&PropertyName> {
        self.names_with(Disposition::Redact)
    }

    fn names_with(&self, disposition: Disposition) -> Vec<&PropertyName> {
        let mut names: Vec<_> = self
            .rules
            .iter()
            .filter(|(_, d)| **d == disposition)
            .map(|(n, _)| n)
            .collect();
        names.sort();
        names
    }
}

impl Default for PropertyPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for PropertyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kept, {} redacted, mailbox UIDs: {:?}",
            self.kept().len(),
            self.redacted().len(),
            self.mailbox_uids
        )
    }
}

/// Builder for [`PropertyPolicy`].
///
/// Later calls win, so a configured `keep` can override a standard `redact`.
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    rules: HashMap<PropertyName, Disposition>,
    mailbox_uids: MailboxUidRule,
}

impl PolicyBuilder {
    /// Starts from the built-in table.
    pub fn standard() -> Self {
        use PropertyName::*;

        let keep = [
            CalScale,
            Method,
            Version,
            Class,
            Description,
            Priority,
            Status,
            Summary,
            Completed,
            DateTimeEnd,
            Due,
            DateTimeStart,
            Duration,
            FreeBusy,
            Transparency,
            TimezoneId,
            TimezoneName,
            TimezoneOffsetFrom,
            TimezoneOffsetTo,
            TimezoneUrl,
            RecurrenceId,
            Uid,
            ExceptionDates,
            RecurrenceDates,
            RecurrenceRule,
            Action,
            Repeat,
            Trigger,
            Created,
            DateTimeStamp,
            LastModified,
            Sequence,
            Acknowledged,
            MozLastAck,
            MozGeneration,
            SenderId,
        ];
        let redact = [
            ProductId,
            Attach,
            Categories,
            Comment,
            Geo,
            Location,
            PercentComplete,
            Resources,
            Attendee,
            Contact,
            Organizer,
            RelatedTo,
            Url,
            RequestStatus,
        ];

        Self::default().keep_all(keep).redact_all(redact)
    }

    /// Marks a property as kept.
    pub fn keep(self, name: impl Into<PropertyName>) -> Self {
        self.rule(name, Disposition::Keep)
    }

    /// Marks a property as redacted.
    pub fn redact(self, name: impl Into<PropertyName>) -> Self {
        self.rule(name, Disposition::Redact)
    }

    /// Marks several properties as kept.
    pub fn keep_all<I, N>(self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<PropertyName>,
    {
        names.into_iter().fold(self, |b, n| b.keep(n))
    }

    /// Marks several properties as redacted.
    pub fn redact_all<I, N>(self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<PropertyName>,
    {
        names.into_iter().fold(self, |b, n| b.redact(n))
    }

    /// Sets a disposition for a property.
    pub fn rule(mut self, name: impl Into<PropertyName>, disposition: Disposition) -> Self {
        self.rules.insert(name.into(), disposition);
        self
    }

    /// Sets the mailbox-style UID rule.
    pub fn mailbox_uids(mut self, rule: MailboxUidRule) -> Self {
        self.mailbox_uids = rule;
        self
    }

    /// Freezes the policy.
    pub fn build(self) -> PropertyPolicy {
        PropertyPolicy {
            rules: self.rules,
            mailbox_uids: self.mailbox_uids,
        }
    }
}
