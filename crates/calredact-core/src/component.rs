//! The iCalendar component tree.
//!
//! A [`Component`] is one node of an iCalendar object (`VCALENDAR`,
//! `VEVENT`, `VALARM`, ...). It owns its properties and its children
//! outright; traversal is always top-down, so there are no parent links.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `VCALENDAR`
pub const CALENDAR: &str = "VCALENDAR";
/// `VEVENT`
pub const EVENT: &str = "VEVENT";
/// `VTODO`
pub const TODO: &str = "VTODO";
/// `VJOURNAL`
pub const JOURNAL: &str = "VJOURNAL";
/// `VFREEBUSY`
pub const FREE_BUSY: &str = "VFREEBUSY";
/// `VALARM`
pub const ALARM: &str = "VALARM";
/// `VTIMEZONE`
pub const TIMEZONE: &str = "VTIMEZONE";

/// A single property occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prop {
    /// The property name, e.g. `ATTENDEE`.
    pub name: String,
    /// The raw property value, as found on the wire.
    pub value: String,
    /// Property parameters, e.g. `TZID` or `VALUE`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl Prop {
    /// Creates a property without parameters.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Builder method to add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Returns a parameter value, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// One node of an iCalendar tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The component name, e.g. `VEVENT`.
    pub name: String,
    /// Properties grouped by name, in first-seen order.
    #[serde(default)]
    pub properties: IndexMap<String, Vec<Prop>>,
    /// Child components, in document order.
    #[serde(default)]
    pub children: Vec<Component>,
}

impl Component {
    /// Creates an empty component with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Appends a property occurrence, keeping any existing ones.
    pub fn push_prop(&mut self, prop: Prop) {
        self.properties
            .entry(prop.name.clone())
            .or_default()
            .push(prop);
    }

    /// Replaces every occurrence of the property with this single one.
    pub fn set_prop(&mut self, prop: Prop) {
        self.properties.insert(prop.name.clone(), vec![prop]);
    }

    /// Shorthand for setting a parameterless property.
    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.set_prop(Prop::new(name, value));
    }

    /// Builder method to append a property.
    pub fn with_prop(mut self, prop: Prop) -> Self {
        self.push_prop(prop);
        self
    }

    /// Builder method to append a parameterless property.
    pub fn with_text(self, name: &str, value: impl Into<String>) -> Self {
        self.with_prop(Prop::new(name, value))
    }

    /// Builder method to append a child component.
    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    /// Returns all occurrences of a property (empty if absent).
    pub fn props(&self, name: &str) -> &[Prop] {
        self.properties.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the first occurrence of a property.
    pub fn prop(&self, name: &str) -> Option<&Prop> {
        self.props(name).first()
    }

    /// Returns the value of the first occurrence of a property.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.prop(name).map(|p| p.value.as_str())
    }

    /// Returns the `UID` of this component, if any.
    pub fn uid(&self) -> Option<&str> {
        self.value("UID")
    }

    /// Returns true if this component is named `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Iterates over the direct children named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Component> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Iterates over the `VEVENT`s of this component: itself when it is an
    /// event, otherwise its direct event children.
    pub fn events(&self) -> Box<dyn Iterator<Item = &Component> + '_> {
        if self.is(EVENT) {
            Box::new(std::iter::once(self))
        } else {
            Box::new(self.children_named(EVENT))
        }
    }

    /// Total number of property occurrences on this node.
    pub fn prop_count(&self) -> usize {
        self.properties.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_valued_props_keep_order() {
        let event = Component::new(EVENT)
            .with_text("ATTENDEE", "mailto:a@example.com")
            .with_text("SUMMARY", "Standup")
            .with_text("ATTENDEE", "mailto:b@example.com");

        let attendees: Vec<_> = event.props("ATTENDEE").iter().map(|p| &p.value).collect();
        assert_eq!(attendees, ["mailto:a@example.com", "mailto:b@example.com"]);

        let names: Vec<_> = event.properties.keys().collect();
        assert_eq!(names, ["ATTENDEE", "SUMMARY"]);
        assert_eq!(event.prop_count(), 3);
    }

    #[test]
    fn set_prop_replaces_occurrences() {
        let mut event = Component::new(EVENT)
            .with_text("SEQUENCE", "0")
            .with_text("SEQUENCE", "1");
        event.set_text("SEQUENCE", "2");

        assert_eq!(event.props("SEQUENCE").len(), 1);
        assert_eq!(event.value("SEQUENCE"), Some("2"));
    }

    #[test]
    fn missing_property_is_empty() {
        let event = Component::new(EVENT);
        assert!(event.props("UID").is_empty());
        assert!(event.uid().is_none());
    }

    #[test]
    fn params_are_accessible() {
        let prop = Prop::new("DTSTART", "20240110T100000").with_param("TZID", "Europe/Paris");
        assert_eq!(prop.param("TZID"), Some("Europe/Paris"));
        assert_eq!(prop.param("VALUE"), None);
    }

    #[test]
    fn events_of_calendar_and_event() {
        let event = Component::new(EVENT).with_text("UID", "1");
        let calendar = Component::new(CALENDAR)
            .with_child(Component::new(TIMEZONE))
            .with_child(event.clone());

        assert_eq!(calendar.events().count(), 1);
        assert_eq!(event.events().next(), Some(&event));
    }
}
