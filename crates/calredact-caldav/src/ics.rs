//! iCalendar (RFC 5545) decoding and encoding.
//!
//! Decoding goes through the `icalendar` crate's parser, which handles line
//! unfolding and the content-line grammar; the result is converted into
//! owned [`Component`] trees. Values of TEXT properties come out unescaped
//! (`\,` as `,`, `\n` as a newline) and [`encode`] escapes the same set of
//! properties on the way back, so decoded trees hold plain text.

use calredact_core::component::{self, Component, Prop};
use icalendar::{ValueType, parser};
use thiserror::Error;
use tracing::trace;

/// Maximum length of a content line in octets, excluding the CRLF.
const MAX_LINE_OCTETS: usize = 75;

/// Errors from [`decode`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid UTF-8.
    #[error("calendar data is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload contains no content lines.
    #[error("calendar data is empty")]
    Empty,

    /// The content lines do not form a calendar.
    #[error("failed to parse calendar data: {0}")]
    Parse(String),
}

/// Decodes a payload into component trees, one per `VCALENDAR` block.
///
/// A payload without any `VCALENDAR` wrapper yields its top-level components
/// as they are.
///
/// # Errors
///
/// Returns a [`DecodeError`] for non-UTF-8, empty, or malformed input.
pub fn decode(data: &[u8]) -> Result<Vec<Component>, DecodeError> {
    let text = std::str::from_utf8(data)?;
    let unfolded = parser::unfold(text);
    if unfolded.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let blocks = calendar_blocks(&unfolded);
    if blocks.is_empty() {
        let parsed = parser::read_calendar(&unfolded).map_err(DecodeError::Parse)?;
        return Ok(parsed.components.iter().map(convert_component).collect());
    }

    let mut calendars = Vec::with_capacity(blocks.len());
    for block in blocks {
        let parsed = parser::read_calendar(&block).map_err(DecodeError::Parse)?;
        let mut calendar = Component::new(component::CALENDAR);
        for property in &parsed.properties {
            calendar.push_prop(convert_property(property));
        }
        calendar.children = parsed.components.iter().map(convert_component).collect();
        calendars.push(calendar);
    }

    trace!(calendars = calendars.len(), "Decoded calendar data");
    Ok(calendars)
}

/// Splits unfolded text into its `BEGIN:VCALENDAR` ... `END:VCALENDAR` blocks.
fn calendar_blocks(unfolded: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for line in unfolded.lines() {
        let trimmed = line.trim_end_matches('\r');
        if trimmed.eq_ignore_ascii_case("BEGIN:VCALENDAR") {
            current = Some(String::new());
        }
        if let Some(ref mut block) = current {
            block.push_str(trimmed);
            block.push_str("\r\n");
        }
        if trimmed.eq_ignore_ascii_case("END:VCALENDAR")
            && let Some(block) = current.take()
        {
            blocks.push(block);
        }
    }

    blocks
}

fn convert_component(parsed: &parser::Component<'_>) -> Component {
    let mut node = Component::new(parsed.name.to_string());
    for property in &parsed.properties {
        node.push_prop(convert_property(property));
    }
    node.children = parsed.components.iter().map(convert_component).collect();
    node
}

fn convert_property(parsed: &parser::Property<'_>) -> Prop {
    let mut prop = Prop::new(parsed.name.as_str(), parsed.val.as_str());
    for param in &parsed.params {
        let value = param.val.as_ref().map(|v| v.as_str()).unwrap_or_default();
        prop.parameters
            .insert(param.key.as_str().to_string(), value.trim_matches('"').to_string());
    }
    prop
}

/// Encodes a component tree as iCalendar text with CRLF line endings.
pub fn encode(root: &Component) -> String {
    let mut out = String::new();
    write_component(&mut out, root);
    out
}

fn write_component(out: &mut String, node: &Component) {
    write_line(out, &format!("BEGIN:{}", node.name));
    for prop in node.properties.values().flatten() {
        write_line(out, &content_line(prop));
    }
    for child in &node.children {
        write_component(out, child);
    }
    write_line(out, &format!("END:{}", node.name));
}

fn content_line(prop: &Prop) -> String {
    let mut line = prop.name.clone();
    for (name, value) in &prop.parameters {
        line.push(';');
        line.push_str(name);
        line.push('=');
        if value.contains([':', ';', ',']) {
            line.push('"');
            line.push_str(value);
            line.push('"');
        } else {
            line.push_str(value);
        }
    }
    line.push(':');
    if is_text(prop) {
        line.push_str(&escape_text(&prop.value));
    } else {
        line.push_str(&prop.value);
    }
    line
}

/// Whether the parser treats the value as TEXT, either by property name or
/// through a `VALUE` parameter.
fn is_text(prop: &Prop) -> bool {
    let mut typed = icalendar::Property::new(prop.name.as_str(), "");
    if let Some(value_type) = prop.param("VALUE") {
        typed.add_parameter("VALUE", value_type);
    }
    matches!(typed.value_type(), Some(ValueType::Text))
}

/// RFC 5545 section 3.3.11 escaping.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Writes one content line, folding it at octet boundaries that don't split
/// a UTF-8 sequence.
fn write_line(out: &mut String, line: &str) {
    let mut rest = line;
    let mut limit = MAX_LINE_OCTETS;

    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        // continuation lines carry a leading space
        limit = MAX_LINE_OCTETS - 1;
    }

    out.push_str(rest);
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use calredact_core::{PropertyName, PropertyPolicy, redact};

    const STANDUP: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Example Corp//Calendar//EN\r\n\
BEGIN:VEVENT\r\n\
UID:1234-5678\r\n\
SUMMARY:Standup\r\n\
DTSTART;TZID=Europe/Paris:20240110T100000\r\n\
DTEND;TZID=Europe/Paris:20240110T110000\r\n\
ATTENDEE;CN=Alice;ROLE=REQ-PARTICIPANT:mailto:alice@example.com\r\n\
ATTENDEE;CN=Bob:mailto:bob@example.com\r\n\
DESCRIPTION:A very long description that certainly does not fit in a sin\r\n \
gle content line of seventy-five octets\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn decode_builds_tree() {
        let calendars = decode(STANDUP.as_bytes()).unwrap();
        assert_eq!(calendars.len(), 1);

        let calendar = &calendars[0];
        assert_eq!(calendar.name, "VCALENDAR");
        assert_eq!(calendar.value("VERSION"), Some("2.0"));

        let event = &calendar.children[0];
        assert_eq!(event.name, "VEVENT");
        assert_eq!(event.uid(), Some("1234-5678"));
        assert_eq!(event.props("ATTENDEE").len(), 2);
        assert_eq!(event.prop("ATTENDEE").and_then(|p| p.param("CN")), Some("Alice"));
        assert_eq!(event.prop("DTSTART").and_then(|p| p.param("TZID")), Some("Europe/Paris"));
        assert!(event.value("DESCRIPTION").unwrap().ends_with("seventy-five octets"));
        assert_eq!(event.children[0].name, "VALARM");
    }

    #[test]
    fn decode_multiple_calendars() {
        let payload = format!("{STANDUP}{STANDUP}");
        assert_eq!(decode(payload.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn decode_rejects_invalid_input() {
        assert!(matches!(decode(&[0xff, 0xfe]), Err(DecodeError::InvalidUtf8(_))));
        assert!(matches!(decode(b"  \r\n"), Err(DecodeError::Empty)));
    }

    #[test]
    fn encode_folds_long_lines() {
        let event = Component::new("VEVENT").with_text("DESCRIPTION", "x".repeat(200));
        let text = encode(&event);

        for line in text.split("\r\n") {
            assert!(line.len() <= MAX_LINE_OCTETS, "line too long: {line:?}");
        }
        assert!(text.starts_with("BEGIN:VEVENT\r\nDESCRIPTION:"));
        assert!(text.ends_with("END:VEVENT\r\n"));
    }

    #[test]
    fn encode_folding_respects_utf8() {
        let event = Component::new("VEVENT").with_text("SUMMARY", "é".repeat(80));
        let text = encode(&event);
        let unfolded = parser::unfold(&text);
        assert!(unfolded.contains(&"é".repeat(80)));
    }

    #[test]
    fn encode_quotes_parameters() {
        let prop = Prop::new("ATTENDEE", "mailto:a@b.com").with_param("CN", "Doe, Jane");
        let event = Component::new("VEVENT").with_prop(prop);
        assert_eq!(
            encode(&event),
            "BEGIN:VEVENT\r\nATTENDEE;CN=\"Doe, Jane\":mailto:a@b.com\r\nEND:VEVENT\r\n"
        );
    }

    #[test]
    fn round_trip_with_keep_all_policy() {
        let policy = PropertyPolicy::builder()
            .keep_all(PropertyName::KNOWN.iter().cloned())
            .build();

        let original = decode(STANDUP.as_bytes()).unwrap().remove(0);
        let kept = redact(&original, &policy);
        assert_eq!(kept, original);

        let again = decode(encode(&kept).as_bytes()).unwrap().remove(0);
        assert_eq!(again, original);
    }

    #[test]
    fn hand_built_tree_round_trips() {
        let alarm = Component::new("VALARM")
            .with_text("ACTION", "DISPLAY")
            .with_text("TRIGGER", "-PT58M");
        let event = Component::new("VEVENT")
            .with_text("UID", "1234-5678")
            .with_text("SUMMARY", "Standup")
            .with_prop(Prop::new("DTSTART", "20240110T100000").with_param("TZID", "Europe/Paris"))
            .with_text("EXDATE", "20240111T090000Z")
            .with_text("EXDATE", "20240112T090000Z")
            .with_child(alarm);
        let calendar = Component::new("VCALENDAR")
            .with_text("VERSION", "2.0")
            .with_text("CALSCALE", "GREGORIAN")
            .with_child(event);

        let policy = PropertyPolicy::builder()
            .keep_all(PropertyName::KNOWN.iter().cloned())
            .build();
        let decoded = decode(encode(&calendar).as_bytes()).unwrap().remove(0);

        assert_eq!(redact(&decoded, &policy), calendar);
    }

    #[test]
    fn text_values_are_escaped() {
        let event = Component::new("VEVENT")
            .with_text("DESCRIPTION", "Line1\nLine2")
            .with_text("LOCATION", "Room 1; floor 2, east")
            .with_text("X-NOTE", "x,y");
        assert_eq!(
            encode(&event),
            "BEGIN:VEVENT\r\n\
DESCRIPTION:Line1\\nLine2\r\n\
LOCATION:Room 1\\; floor 2\\, east\r\n\
X-NOTE:x,y\r\n\
END:VEVENT\r\n"
        );
    }

    #[test]
    fn text_values_round_trip() {
        let event = Component::new("VEVENT")
            .with_text("UID", "1234-5678")
            .with_text("DESCRIPTION", "Line1\nLine2\n\nagenda: a, b; c")
            .with_text("SUMMARY", "a\\,b")
            .with_text("COMMENT", "C:\\temp\\files")
            .with_text("LOCATION", "é".repeat(40) + ", " + &"x".repeat(40))
            .with_prop(Prop::new("X-NOTE", "kept;as,is").with_param("VALUE", "TEXT"))
            .with_text("X-RAW", "x,y");
        let calendar = Component::new("VCALENDAR")
            .with_text("VERSION", "2.0")
            .with_child(event);

        let decoded = decode(encode(&calendar).as_bytes()).unwrap().remove(0);

        assert_eq!(decoded, calendar);
        let event = &decoded.children[0];
        assert_eq!(event.value("DESCRIPTION"), Some("Line1\nLine2\n\nagenda: a, b; c"));
        assert_eq!(event.value("SUMMARY"), Some("a\\,b"));
    }

    #[test]
    fn escaped_input_decodes_to_plain_text() {
        let payload = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:1\r\n\
DESCRIPTION:one\\, two\\ntwo\\; three\r\n\
URL:https://example.com/a,b\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let calendar = decode(payload.as_bytes()).unwrap().remove(0);
        let event = &calendar.children[0];
        assert_eq!(event.value("DESCRIPTION"), Some("one, two\ntwo; three"));
        assert_eq!(event.value("URL"), Some("https://example.com/a,b"));
        assert_eq!(encode(&calendar), payload);
    }

    #[test]
    fn redacted_output_decodes() {
        let original = decode(STANDUP.as_bytes()).unwrap().remove(0);
        let redacted = redact(&original, &PropertyPolicy::standard());

        let again = decode(encode(&redacted).as_bytes()).unwrap().remove(0);
        assert_eq!(again, redacted);
        assert!(again.children[0].props("ATTENDEE").is_empty());
        assert!(again.props("PRODID").is_empty());
    }
}
