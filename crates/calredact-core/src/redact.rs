//! Recursive component redaction.
//!
//! [`Redactor`] rewrites a component tree against a [`PropertyPolicy`] and
//! returns a new tree; the input is never touched. Properties the policy
//! does not know about are dropped and reported as [`Diagnostic`]s, which are
//! also emitted through `tracing`. Redaction never fails.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::component::Component;
use crate::policy::{Disposition, MailboxUidRule, PropertyPolicy};

/// Something the redactor noticed but recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A property absent from the policy was dropped.
    UnknownProperty {
        component: String,
        uid: Option<String>,
        property: String,
    },
    /// A mailbox-style UID was dropped under [`MailboxUidRule::Drop`].
    AmbiguousUid { component: String, uid: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty {
                component,
                uid,
                property,
            } => write!(
                f,
                "dropped unknown property {property} on {component} (uid: {})",
                uid.as_deref().unwrap_or("-")
            ),
            Self::AmbiguousUid { component, uid } => {
                write!(f, "dropped mailbox-style UID {uid} on {component}")
            }
        }
    }
}

/// The result of redacting a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redacted {
    /// The sanitized tree.
    pub component: Component,
    /// Everything dropped for reasons other than an explicit `Redact` rule.
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites component trees against a borrowed policy.
#[derive(Debug, Clone, Copy)]
pub struct Redactor<'p> {
    policy: &'p PropertyPolicy,
}

impl<'p> Redactor<'p> {
    /// Creates a redactor for a policy.
    pub fn new(policy: &'p PropertyPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy in use.
    pub fn policy(&self) -> &'p PropertyPolicy {
        self.policy
    }

    /// Redacts a tree, logging diagnostics.
    pub fn redact(&self, component: &Component) -> Component {
        self.redact_with_diagnostics(component).component
    }

    /// Redacts a tree and returns the diagnostics alongside it.
    ///
    /// Every diagnostic is also logged at `warn` level.
    pub fn redact_with_diagnostics(&self, component: &Component) -> Redacted {
        let mut diagnostics = Vec::new();
        let component = self.redact_node(component, &mut diagnostics);

        for diagnostic in &diagnostics {
            match diagnostic {
                Diagnostic::UnknownProperty {
                    component,
                    uid,
                    property,
                } => warn!(
                    component = %component,
                    uid = uid.as_deref().unwrap_or("-"),
                    property = %property,
                    "Redacted unknown property"
                ),
                Diagnostic::AmbiguousUid { component, uid } => warn!(
                    component = %component,
                    uid = %uid,
                    "Redacted mailbox-style UID"
                ),
            }
        }

        Redacted {
            component,
            diagnostics,
        }
    }

    fn redact_node(&self, input: &Component, diagnostics: &mut Vec<Diagnostic>) -> Component {
        let mut output = Component::new(input.name.clone());

        for (name, props) in &input.properties {
            match self.policy.disposition(name) {
                None => diagnostics.push(Diagnostic::UnknownProperty {
                    component: input.name.clone(),
                    uid: input.uid().map(str::to_string),
                    property: name.clone(),
                }),
                Some(Disposition::Redact) => {}
                Some(Disposition::Keep) => {
                    if name == "UID"
                        && self.policy.mailbox_uids() == MailboxUidRule::Drop
                        && let Some(mailbox) = props.iter().find(|p| p.value.contains('@'))
                    {
                        diagnostics.push(Diagnostic::AmbiguousUid {
                            component: input.name.clone(),
                            uid: mailbox.value.clone(),
                        });
                        continue;
                    }
                    output.properties.insert(name.clone(), props.clone());
                }
            }
        }

        output.children = input
            .children
            .iter()
            .map(|child| self.redact_node(child, diagnostics))
            .collect();

        debug!(
            component = %input.name,
            kept = output.prop_count(),
            dropped = input.prop_count() - output.prop_count(),
            "Redacted component"
        );

        output
    }
}

/// Redacts a tree against a policy.
pub fn redact(component: &Component, policy: &PropertyPolicy) -> Component {
    Redactor::new(policy).redact(component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ALARM, CALENDAR, EVENT, Prop};
    use crate::policy::PolicyBuilder;

    fn scenario_policy() -> PropertyPolicy {
        PropertyPolicy::builder()
            .keep("SUMMARY")
            .redact("ATTENDEE")
            .keep("UID")
            .build()
    }

    fn sample_calendar() -> Component {
        let alarm = Component::new(ALARM)
            .with_text("ACTION", "DISPLAY")
            .with_text("TRIGGER", "-PT58M")
            .with_text("X-APPLE-DEFAULT-ALARM", "TRUE");
        let event = Component::new(EVENT)
            .with_text("UID", "1234-5678")
            .with_text("SUMMARY", "Standup")
            .with_prop(Prop::new("ATTENDEE", "mailto:a@b.com").with_param("CN", "A"))
            .with_text("ATTENDEE", "mailto:c@d.com")
            .with_text("LOCATION", "Room 1")
            .with_text("EXDATE", "20240111T100000Z")
            .with_text("EXDATE", "20240112T100000Z")
            .with_child(alarm);
        Component::new(CALENDAR)
            .with_text("VERSION", "2.0")
            .with_text("PRODID", "-//Example//EN")
            .with_child(Component::new("VTIMEZONE").with_text("TZID", "Europe/Paris"))
            .with_child(event)
    }

    #[test]
    fn standup_scenario() {
        let input = Component::new(EVENT)
            .with_text("SUMMARY", "Standup")
            .with_text("ATTENDEE", "a@b.com")
            .with_text("UID", "1234-5678");

        let output = redact(&input, &scenario_policy());

        let expected = Component::new(EVENT)
            .with_text("SUMMARY", "Standup")
            .with_text("UID", "1234-5678");
        assert_eq!(output, expected);
        assert!(output.children.is_empty());
    }

    #[test]
    fn redaction_is_idempotent() {
        let policy = PropertyPolicy::standard();
        let once = redact(&sample_calendar(), &policy);
        let twice = redact(&once, &policy);
        assert_eq!(once, twice);
    }

    #[test]
    fn idempotent_with_mailbox_drop() {
        let policy = PolicyBuilder::standard()
            .mailbox_uids(MailboxUidRule::Drop)
            .build();
        let event = Component::new(EVENT).with_text("UID", "abc@google.com");
        let once = redact(&event, &policy);
        assert_eq!(redact(&once, &policy), once);
    }

    #[test]
    fn kept_properties_preserve_every_occurrence_in_order() {
        let policy = PropertyPolicy::standard();
        let output = redact(&sample_calendar(), &policy);
        let event = &output.children[1];

        let exdates: Vec<_> = event.props("EXDATE").iter().map(|p| p.value.as_str()).collect();
        assert_eq!(exdates, ["20240111T100000Z", "20240112T100000Z"]);
        assert!(event.props("ATTENDEE").is_empty());
        assert!(event.props("LOCATION").is_empty());
        assert!(output.props("PRODID").is_empty());
        assert_eq!(output.value("VERSION"), Some("2.0"));
    }

    #[test]
    fn redacted_properties_never_survive() {
        let policy = PropertyPolicy::standard();
        let output = redact(&sample_calendar(), &policy);

        fn walk(c: &Component, policy: &PropertyPolicy) {
            for name in c.properties.keys() {
                assert!(policy.keeps(name), "{name} survived redaction");
            }
            c.children.iter().for_each(|child| walk(child, policy));
        }
        walk(&output, &policy);
    }

    #[test]
    fn children_order_is_preserved() {
        let output = redact(&sample_calendar(), &PropertyPolicy::standard());
        let names: Vec<_> = output.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["VTIMEZONE", "VEVENT"]);
        assert_eq!(output.children[1].children[0].name, "VALARM");
        assert!(output.children[0].children.is_empty());
    }

    #[test]
    fn unknown_property_yields_one_diagnostic() {
        let input = Component::new(EVENT)
            .with_text("UID", "1234-5678")
            .with_text("SUMMARY", "Standup")
            .with_text("X-UNKNOWN", "secret");

        let result = Redactor::new(&scenario_policy()).redact_with_diagnostics(&input);

        assert!(result.component.props("X-UNKNOWN").is_empty());
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::UnknownProperty {
                component: "VEVENT".to_string(),
                uid: Some("1234-5678".to_string()),
                property: "X-UNKNOWN".to_string(),
            }]
        );
    }

    #[test]
    fn nested_unknown_property_is_reported() {
        let result = Redactor::new(&PropertyPolicy::standard()).redact_with_diagnostics(&sample_calendar());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "dropped unknown property X-APPLE-DEFAULT-ALARM on VALARM (uid: -)"
        );
    }

    #[test]
    fn mailbox_uid_is_kept_by_default() {
        let event = Component::new(EVENT).with_text("UID", "abc@google.com");
        let result = Redactor::new(&PropertyPolicy::standard()).redact_with_diagnostics(&event);
        assert_eq!(result.component.uid(), Some("abc@google.com"));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn mailbox_uid_dropped_when_configured() {
        let policy = PolicyBuilder::standard()
            .mailbox_uids(MailboxUidRule::Drop)
            .build();
        let event = Component::new(EVENT)
            .with_text("UID", "abc@google.com")
            .with_text("SUMMARY", "Standup");

        let result = Redactor::new(&policy).redact_with_diagnostics(&event);

        assert!(result.component.uid().is_none());
        assert_eq!(result.component.value("SUMMARY"), Some("Standup"));
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::AmbiguousUid {
                component: "VEVENT".to_string(),
                uid: "abc@google.com".to_string(),
            }]
        );

        let opaque = Component::new(EVENT).with_text("UID", "1234-5678");
        assert_eq!(Redactor::new(&policy).redact(&opaque).uid(), Some("1234-5678"));
    }

    #[test]
    fn input_is_not_modified() {
        let input = sample_calendar();
        let snapshot = input.clone();
        let _ = redact(&input, &PropertyPolicy::standard());
        assert_eq!(input, snapshot);
    }

    #[test]
    fn diagnostics_serialize_with_kind() {
        let diagnostic = Diagnostic::AmbiguousUid {
            component: "VEVENT".to_string(),
            uid: "a@b".to_string(),
        };
        insta::assert_json_snapshot!(diagnostic, @r#"
        {
          "kind": "ambiguous_uid",
          "component": "VEVENT",
          "uid": "a@b"
        }
        "#);
    }
}
