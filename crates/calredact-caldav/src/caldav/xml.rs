//! XML bodies and multistatus parsing for WebDAV/CalDAV requests.

use std::io::Cursor;

use calredact_core::time::format_utc;
use calredact_core::{CalendarQuery, CompFilter, CompRequest};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::error::{TransportError, TransportResult};
use crate::transport::{CalendarInfo, CalendarObject};

/// DAV namespace
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";
/// CalendarServer namespace (for `getctag`)
pub const CS_NS: &str = "http://calendarserver.org/ns/";

/// Incremental writer for request bodies.
struct XmlBody {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlBody {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> std::io::Result<()> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(element))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> std::io::Result<()> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(element))
    }

    fn end(&mut self, name: &str) -> std::io::Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> TransportResult<String> {
        String::from_utf8(self.writer.into_inner().into_inner())
            .map_err(|e| TransportError::internal("Request body is not UTF-8").with_source(e))
    }
}

fn write_failed(e: std::io::Error) -> TransportError {
    TransportError::internal(format!("Failed to write request body: {}", e)).with_source(e)
}

/// Builds a `<d:propfind>` asking for the given properties.
fn propfind_body(props: &[&str]) -> TransportResult<String> {
    let mut body = XmlBody::new();
    (|| -> std::io::Result<()> {
        body.start(
            "d:propfind",
            &[("xmlns:d", DAV_NS), ("xmlns:c", CALDAV_NS), ("xmlns:cs", CS_NS)],
        )?;
        body.start("d:prop", &[])?;
        for prop in props {
            body.empty(prop, &[])?;
        }
        body.end("d:prop")?;
        body.end("d:propfind")
    })()
    .map_err(write_failed)?;
    body.finish()
}

/// PROPFIND body for `current-user-principal` discovery (Depth 0).
pub fn propfind_principal_body() -> TransportResult<String> {
    propfind_body(&["d:current-user-principal"])
}

/// PROPFIND body for `calendar-home-set` discovery (Depth 0).
pub fn propfind_home_set_body() -> TransportResult<String> {
    propfind_body(&["c:calendar-home-set"])
}

/// PROPFIND body for listing calendars in a home set (Depth 1).
pub fn propfind_calendars_body() -> TransportResult<String> {
    propfind_body(&[
        "d:displayname",
        "d:resourcetype",
        "c:calendar-description",
        "c:supported-calendar-component-set",
        "cs:getctag",
    ])
}

/// REPORT body for a `calendar-query`.
///
/// The [`CompRequest`] becomes nested `<c:comp>`/`<c:prop>` elements inside
/// `<c:calendar-data>`; the [`CompFilter`] becomes nested
/// `<c:comp-filter>`/`<c:time-range>` elements inside `<c:filter>`.
pub fn calendar_query_body(query: &CalendarQuery) -> TransportResult<String> {
    let mut body = XmlBody::new();
    (|| -> std::io::Result<()> {
        body.start(
            "c:calendar-query",
            &[("xmlns:d", DAV_NS), ("xmlns:c", CALDAV_NS)],
        )?;
        body.start("d:prop", &[])?;
        body.empty("d:getetag", &[])?;
        body.start("c:calendar-data", &[])?;
        write_comp(&mut body, &query.request)?;
        body.end("c:calendar-data")?;
        body.end("d:prop")?;
        body.start("c:filter", &[])?;
        write_comp_filter(&mut body, &query.filter)?;
        body.end("c:filter")?;
        body.end("c:calendar-query")
    })()
    .map_err(write_failed)?;
    body.finish()
}

fn write_comp(body: &mut XmlBody, request: &CompRequest) -> std::io::Result<()> {
    let name = [("name", request.name.as_str())];
    if request.properties.is_empty() && request.nested.is_empty() {
        return body.empty("c:comp", &name);
    }
    body.start("c:comp", &name)?;
    for prop in &request.properties {
        body.empty("c:prop", &[("name", prop.as_str())])?;
    }
    for nested in &request.nested {
        write_comp(body, nested)?;
    }
    body.end("c:comp")
}

fn write_comp_filter(body: &mut XmlBody, filter: &CompFilter) -> std::io::Result<()> {
    let name = [("name", filter.name.as_str())];
    if filter.time_range.is_none() && filter.nested.is_empty() {
        return body.empty("c:comp-filter", &name);
    }
    body.start("c:comp-filter", &name)?;
    if let Some(range) = filter.time_range {
        let start = format_utc(range.start);
        let end = format_utc(range.end);
        body.empty(
            "c:time-range",
            &[("start", start.as_str()), ("end", end.as_str())],
        )?;
    }
    for nested in &filter.nested {
        write_comp_filter(body, nested)?;
    }
    body.end("c:comp-filter")
}

/// One `<d:response>` of a multistatus document.
#[derive(Debug, Default)]
struct DavResponse {
    href: Option<String>,
    principal: Option<String>,
    home_set: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    ctag: Option<String>,
    etag: Option<String>,
    calendar_data: Option<String>,
    is_calendar: bool,
    components: Vec<String>,
}

impl DavResponse {
    fn set_text(&mut self, path: &[String], text: String) {
        let Some(current) = path.last() else {
            return;
        };
        // calendar data may arrive in several text and CDATA chunks
        if current == "calendar-data" {
            self.calendar_data
                .get_or_insert_with(String::new)
                .push_str(&text);
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let text = text.to_string();
        let within = |name: &str| path.iter().any(|p| p == name);

        match current.as_str() {
            "href" if within("current-user-principal") => self.principal = Some(text),
            "href" if within("calendar-home-set") => self.home_set = Some(text),
            "href" if path.len() >= 2 && path[path.len() - 2] == "response" => {
                self.href = Some(text)
            }
            "displayname" => self.display_name = Some(text),
            "calendar-description" => self.description = Some(text),
            "getctag" => self.ctag = Some(text),
            "getetag" => self.etag = Some(text.trim_matches('"').to_string()),
            _ => {}
        }
    }

    fn mark(&mut self, path: &[String], element: &BytesStart<'_>) -> TransportResult<()> {
        let local = local_name(element);
        let within = |name: &str| path.iter().any(|p| p == name);

        if local == "calendar" && within("resourcetype") {
            self.is_calendar = true;
        } else if local == "comp"
            && within("supported-calendar-component-set")
            && let Some(attr) = element.try_get_attribute("name").map_err(malformed)?
        {
            let value = attr.unescape_value().map_err(malformed)?;
            self.components.push(value.into_owned());
        }
        Ok(())
    }
}

fn malformed<E>(e: E) -> TransportError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TransportError::invalid_response(format!("Malformed multistatus response: {}", e)).with_source(e)
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Walks a multistatus document and collects its responses.
fn parse_multistatus(xml: &str) -> TransportResult<Vec<DavResponse>> {
    let mut reader = quick_xml::Reader::from_str(xml);

    let mut responses = Vec::new();
    let mut current: Option<DavResponse> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let local = local_name(&e);
                if local == "response" {
                    current = Some(DavResponse::default());
                } else if let Some(ref mut response) = current {
                    response.mark(&path, &e)?;
                }
                path.push(local);
            }
            Event::Empty(e) => {
                if let Some(ref mut response) = current {
                    response.mark(&path, &e)?;
                }
            }
            Event::End(_) => {
                if path.pop().as_deref() == Some("response")
                    && let Some(response) = current.take()
                {
                    responses.push(response);
                }
            }
            Event::Text(e) => {
                if let Some(ref mut response) = current {
                    let text = e.unescape().map_err(malformed)?.into_owned();
                    response.set_text(&path, text);
                }
            }
            Event::CData(e) => {
                if let Some(ref mut response) = current {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    response.set_text(&path, text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(responses)
}

/// Extracts the `current-user-principal` href.
pub fn parse_principal(xml: &str) -> TransportResult<Option<String>> {
    Ok(parse_multistatus(xml)?
        .into_iter()
        .find_map(|r| r.principal))
}

/// Extracts the `calendar-home-set` href.
pub fn parse_home_set(xml: &str) -> TransportResult<Option<String>> {
    Ok(parse_multistatus(xml)?.into_iter().find_map(|r| r.home_set))
}

/// Extracts the calendar collections from a Depth 1 PROPFIND response.
pub fn parse_calendars(xml: &str) -> TransportResult<Vec<CalendarInfo>> {
    Ok(parse_multistatus(xml)?
        .into_iter()
        .filter(|r| r.is_calendar)
        .filter_map(|r| {
            let href = r.href?;
            Some(CalendarInfo {
                path: href,
                name: r.display_name,
                description: r.description,
                components: r.components,
                ctag: r.ctag,
            })
        })
        .collect())
}

/// Extracts calendar objects from a calendar-query REPORT response.
///
/// Responses without calendar data (e.g. 404 propstats) are skipped. The
/// data is the concatenation of every text and CDATA chunk of the element,
/// trimmed only at its ends.
pub fn parse_report(xml: &str) -> TransportResult<Vec<CalendarObject>> {
    Ok(parse_multistatus(xml)?
        .into_iter()
        .filter_map(|r| {
            let data = r.calendar_data?;
            let data = data.trim();
            if data.is_empty() {
                return None;
            }
            let object = CalendarObject::new(r.href?, data.as_bytes().to_vec());
            Some(match r.etag {
                Some(etag) => object.with_etag(etag),
                None => object,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calredact_core::TimeRange;
    use chrono::{TimeZone, Utc};

    #[test]
    fn principal_body() {
        let body = propfind_principal_body().unwrap();
        assert!(body.contains("<d:current-user-principal/>"));
        assert!(body.starts_with("<d:propfind"));
    }

    #[test]
    fn calendars_body() {
        let body = propfind_calendars_body().unwrap();
        for prop in [
            "displayname",
            "resourcetype",
            "calendar-description",
            "supported-calendar-component-set",
            "getctag",
        ] {
            assert!(body.contains(prop), "missing {prop}");
        }
    }

    #[test]
    fn calendar_query_body_shape() {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let query = CalendarQuery::for_component("VEVENT", ["UID", "SUMMARY"], Some(range));

        insta::assert_snapshot!(calendar_query_body(&query).unwrap(), @r#"
        <c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
          <d:prop>
            <d:getetag/>
            <c:calendar-data>
              <c:comp name="VCALENDAR">
                <c:prop name="VERSION"/>
                <c:comp name="VEVENT">
                  <c:prop name="SUMMARY"/>
                  <c:prop name="UID"/>
                </c:comp>
              </c:comp>
            </c:calendar-data>
          </d:prop>
          <c:filter>
            <c:comp-filter name="VCALENDAR">
              <c:comp-filter name="VEVENT">
                <c:time-range start="20240110T000000Z" end="20240111T000000Z"/>
              </c:comp-filter>
            </c:comp-filter>
          </c:filter>
        </c:calendar-query>
        "#);
    }

    #[test]
    fn unbounded_query_has_no_time_range() {
        let body = calendar_query_body(&CalendarQuery::events(None)).unwrap();
        assert!(!body.contains("time-range"));
        assert!(body.contains(r#"<c:comp-filter name="VEVENT"/>"#));
        assert!(body.contains(r#"<c:prop name="X-PROTEI-SENDERID"/>"#));
    }

    #[test]
    fn parse_principal_and_home_set() {
        let principal = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/dav/</d:href>
    <d:propstat>
      <d:prop>
        <d:current-user-principal><d:href>/dav/principals/alice/</d:href></d:current-user-principal>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;
        assert_eq!(
            parse_principal(principal).unwrap().as_deref(),
            Some("/dav/principals/alice/")
        );
        assert_eq!(parse_home_set(principal).unwrap(), None);

        let home = r#"<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/dav/principals/alice/</href>
    <propstat>
      <prop><C:calendar-home-set><href>/dav/calendars/alice/</href></C:calendar-home-set></prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;
        assert_eq!(
            parse_home_set(home).unwrap().as_deref(),
            Some("/dav/calendars/alice/")
        );
    }

    #[test]
    fn parse_calendar_listing() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav" xmlns:CS="http://calendarserver.org/ns/">
  <response>
    <href>/dav/calendars/alice/</href>
    <propstat>
      <prop><resourcetype><collection/></resourcetype></prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/dav/calendars/alice/work/</href>
    <propstat>
      <prop>
        <displayname>Work</displayname>
        <resourcetype><collection/><C:calendar/></resourcetype>
        <C:supported-calendar-component-set>
          <C:comp name="VEVENT"/>
          <C:comp name="VTODO"/>
        </C:supported-calendar-component-set>
        <CS:getctag>ctag-42</CS:getctag>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
</multistatus>"#;

        let calendars = parse_calendars(xml).unwrap();

        assert_eq!(calendars.len(), 1);
        let work = &calendars[0];
        assert_eq!(work.path, "/dav/calendars/alice/work/");
        assert_eq!(work.name.as_deref(), Some("Work"));
        assert_eq!(work.components, ["VEVENT", "VTODO"]);
        assert_eq!(work.ctag.as_deref(), Some("ctag-42"));
    }

    #[test]
    fn parse_report_objects() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <href>/dav/calendars/alice/work/standup.ics</href>
    <propstat>
      <prop>
        <getetag>"abc123"</getetag>
        <C:calendar-data>BEGIN:VCALENDAR
VERSION:2.0
BEGIN:VEVENT
UID:1234-5678
SUMMARY:Standup
END:VEVENT
END:VCALENDAR</C:calendar-data>
      </prop>
      <status>HTTP/1.1 200 OK</status>
    </propstat>
  </response>
  <response>
    <href>/dav/calendars/alice/work/gone.ics</href>
    <status>HTTP/1.1 404 Not Found</status>
  </response>
</multistatus>"#;

        let objects = parse_report(xml).unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].path, "/dav/calendars/alice/work/standup.ics");
        assert_eq!(objects[0].etag.as_deref(), Some("abc123"));
        assert!(String::from_utf8_lossy(&objects[0].data).contains("SUMMARY:Standup"));
    }

    #[test]
    fn parse_report_joins_escaped_and_cdata_chunks() {
        let xml = "<d:multistatus xmlns:d=\"DAV:\" xmlns:c=\"urn:ietf:params:xml:ns:caldav\">
  <d:response>
    <d:href>/dav/calendars/alice/work/split.ics</d:href>
    <d:propstat>
      <d:prop>
        <c:calendar-data>BEGIN:VCALENDAR&#13;
VERSION:2.0&#13;
<![CDATA[BEGIN:VEVENT
UID:split-1
SUMMARY:Tom & Jerry
]]>END:VEVENT&#13;
END:VCALENDAR&#13;
</c:calendar-data>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>";

        let objects = parse_report(xml).unwrap();

        assert_eq!(objects.len(), 1);
        assert_eq!(
            String::from_utf8_lossy(&objects[0].data),
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\nUID:split-1\nSUMMARY:Tom & Jerry\nEND:VEVENT\r\nEND:VCALENDAR"
        );

        let calendars = crate::ics::decode(&objects[0].data).unwrap();
        let event = &calendars[0].children[0];
        assert_eq!(event.uid(), Some("split-1"));
        assert_eq!(event.value("SUMMARY"), Some("Tom & Jerry"));
    }

    #[test]
    fn malformed_xml_is_invalid_response() {
        let err = parse_report("<multistatus><response></multistatus>").unwrap_err();
        assert_eq!(err.code(), crate::TransportErrorCode::InvalidResponse);
    }
}
