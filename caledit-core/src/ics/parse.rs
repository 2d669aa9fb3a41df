//! ICS parsing using the icalendar crate's parser.

use crate::component::{
    Attachment, Attendee, CalendarComponent, ComponentKind, EventTime, Organizer,
    ParticipationStatus, Recurrence, Reminder, strip_mailto,
};
use icalendar::{
    DatePerhapsTime,
    parser::{Property, read_calendar, unfold},
};

/// Parse ICS content into the first event, task or memo it contains
pub fn parse_component(content: &str) -> Option<CalendarComponent> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;
    let (kind, comp) = calendar
        .components
        .iter()
        .find_map(|c| ComponentKind::from_ics_name(c.name.as_ref()).map(|kind| (kind, c)))?;

    let uid = comp.find_prop("UID")?.val.to_string();

    let text = |name: &str| comp.find_prop(name).map(|p| p.val.to_string());
    let time = |name: &str| {
        comp.find_prop(name)
            .and_then(|p| DatePerhapsTime::try_from(p).ok())
            .map(to_event_time)
    };

    let end = match kind {
        ComponentKind::Event => time("DTEND"),
        ComponentKind::Task => time("DUE"),
        ComponentKind::Memo => None,
    };

    let sequence = comp
        .find_prop("SEQUENCE")
        .and_then(|p| p.val.as_ref().parse().ok())
        .unwrap_or(0);

    let props_named = |name: &'static str| {
        comp.properties
            .iter()
            .filter(move |p| p.name.as_ref() == name)
    };

    let recurrence = Recurrence {
        rrules: props_named("RRULE").map(|p| p.val.to_string()).collect(),
        rdates: props_named("RDATE").flat_map(parse_date_list).collect(),
        exrules: props_named("EXRULE").map(|p| p.val.to_string()).collect(),
        exdates: props_named("EXDATE").flat_map(parse_date_list).collect(),
    };

    let organizer = comp.find_prop("ORGANIZER").map(|p| Organizer {
        email: strip_mailto(p.val.as_ref()).to_string(),
        name: param(p, "CN"),
        sent_by: param(p, "SENT-BY").map(|s| strip_mailto(&s).to_string()),
    });
    let attendees: Vec<Attendee> = props_named("ATTENDEE").map(parse_attendee).collect();

    let attachments: Vec<Attachment> = props_named("ATTACH").map(parse_attachment).collect();

    let reminders: Vec<Reminder> = comp
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(|alarm| {
            let trigger = alarm.find_prop("TRIGGER")?.val.as_ref();
            let minutes = parse_trigger_minutes(trigger)?;
            Some(Reminder { minutes })
        })
        .collect();

    let updated = comp
        .find_prop("LAST-MODIFIED")
        .and_then(|p| {
            chrono::NaiveDateTime::parse_from_str(p.val.as_ref().trim_end_matches('Z'), "%Y%m%dT%H%M%S")
                .ok()
        })
        .map(|dt| dt.and_utc());

    // Custom X- properties (preserved for round-tripping)
    let custom_properties: Vec<(String, String)> = comp
        .properties
        .iter()
        .filter(|p| p.name.as_ref().starts_with("X-"))
        .map(|p| (p.name.to_string(), p.val.to_string()))
        .collect();

    Some(CalendarComponent {
        kind,
        uid,
        recurrence_id: time("RECURRENCE-ID"),
        sequence,
        summary: text("SUMMARY"),
        description: text("DESCRIPTION"),
        location: text("LOCATION"),
        start: time("DTSTART"),
        end,
        organizer,
        attendees,
        recurrence,
        attachments,
        reminders,
        updated,
        custom_properties,
        new_attendees: Vec::new(),
    })
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

fn param(prop: &Property, key: &str) -> Option<String> {
    prop.params
        .iter()
        .find(|p| p.key == key)
        .and_then(|p| p.val.as_ref().map(|v| v.to_string().trim_matches('"').to_string()))
}

/// Parse an RDATE or EXDATE property into a list of times.
///
/// Values may be comma-separated and carry a TZID or VALUE=DATE parameter.
fn parse_date_list(prop: &Property) -> Vec<EventTime> {
    let tzid = param(prop, "TZID");
    let is_date = param(prop, "VALUE").as_deref() == Some("DATE");

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(ref tz) = tzid {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(s) = s.strip_suffix('Z') {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

fn parse_attendee(prop: &Property) -> Attendee {
    let address = |key: &str| param(prop, key).map(|v| strip_mailto(&v).to_string());

    Attendee {
        email: strip_mailto(prop.val.as_ref()).to_string(),
        name: param(prop, "CN"),
        response_status: param(prop, "PARTSTAT")
            .and_then(|v| ParticipationStatus::from_ics_str(&v)),
        role: param(prop, "ROLE"),
        rsvp: param(prop, "RSVP").is_some_and(|v| v.eq_ignore_ascii_case("TRUE")),
        delegated_from: address("DELEGATED-FROM"),
        delegated_to: address("DELEGATED-TO"),
        sent_by: address("SENT-BY"),
    }
}

fn parse_attachment(prop: &Property) -> Attachment {
    let binary = param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("BINARY"))
        || param(prop, "ENCODING").is_some_and(|v| v.eq_ignore_ascii_case("BASE64"));

    if binary {
        Attachment::Inline {
            encoded: prop.val.to_string(),
            fmttype: param(prop, "FMTTYPE"),
        }
    } else {
        Attachment::Url(prop.val.to_string())
    }
}

/// Parse TRIGGER value to minutes before start (-PT30M, -P1D, etc.)
fn parse_trigger_minutes(value: &str) -> Option<i64> {
    let is_before = value.starts_with('-');
    let duration_str = value.trim_start_matches(['-', '+']);

    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let minutes = (std_duration.as_secs() / 60) as i64;

    Some(if is_before { minutes } else { -minutes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_reads_due_and_delegation() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VTODO
UID:task-1
SUMMARY:Review draft
DTSTART;TZID=Europe/Berlin:20250320T090000
DUE;TZID=Europe/Berlin:20250321T090000
ORGANIZER;CN=Alice;SENT-BY="mailto:assistant@example.com":mailto:alice@example.com
ATTENDEE;PARTSTAT=DELEGATED;DELEGATED-TO="mailto:carol@example.com":mailto:bob@example.com
ATTENDEE;DELEGATED-FROM="mailto:bob@example.com";RSVP=TRUE:mailto:carol@example.com
END:VTODO
END:VCALENDAR"#;

        let task = parse_component(ics).expect("Should parse");

        assert_eq!(task.kind, ComponentKind::Task);
        assert_eq!(task.end.as_ref().and_then(EventTime::tzid), Some("Europe/Berlin"));
        let organizer = task.organizer.expect("Should have organizer");
        assert_eq!(organizer.sent_by.as_deref(), Some("assistant@example.com"));
        assert_eq!(task.attendees.len(), 2);
        assert_eq!(
            task.attendees[0].response_status,
            Some(ParticipationStatus::Delegated)
        );
        assert_eq!(
            task.attendees[1].delegated_from.as_deref(),
            Some("bob@example.com")
        );
        assert!(task.attendees[1].rsvp);
    }

    #[test]
    fn test_parse_recurrence_lists() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:test-123
SUMMARY:Recurring Event
DTSTART:20240101T100000Z
DTEND:20240101T110000Z
RRULE:FREQ=WEEKLY;BYDAY=MO
RDATE;VALUE=DATE:20240103
EXDATE;TZID=America/New_York:20240108T100000,20240115T100000
END:VEVENT
END:VCALENDAR"#;

        let event = parse_component(ics).expect("Should parse");

        assert_eq!(event.recurrence.rrules, vec!["FREQ=WEEKLY;BYDAY=MO"]);
        assert_eq!(event.recurrence.rdates.len(), 1);
        assert!(event.recurrence.rdates[0].is_date());
        assert_eq!(event.recurrence.exdates.len(), 2);
        assert!(event.has_recurrences());
    }

    #[test]
    fn test_parse_attachments_and_journal() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VJOURNAL
UID:memo-1
SUMMARY:Notes
DTSTART;VALUE=DATE:20250320
ATTACH:file:///home/user/notes.txt
ATTACH;VALUE=BINARY;ENCODING=BASE64;FMTTYPE=text/plain:aGVsbG8=
END:VJOURNAL
END:VCALENDAR"#;

        let memo = parse_component(ics).expect("Should parse");

        assert_eq!(memo.kind, ComponentKind::Memo);
        assert_eq!(memo.end, None);
        assert_eq!(
            memo.attachments[0],
            Attachment::Url("file:///home/user/notes.txt".to_string())
        );
        assert!(matches!(
            &memo.attachments[1],
            Attachment::Inline { fmttype: Some(t), .. } if t == "text/plain"
        ));
    }

    #[test]
    fn test_parse_line_folding_preserves_whitespace() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:test-123\r\n\
SUMMARY:Test\r\n\
DTSTART:20240101T100000Z\r\n\
DESCRIPTION:Hello \r\n world\r\n\
END:VEVENT\r\n\
END:VCALENDAR";

        let event = parse_component(ics).expect("Should parse");
        assert_eq!(event.description.as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_parse_rejects_calendar_without_components() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\nEND:VCALENDAR\r\n";
        assert!(parse_component(ics).is_none());
    }
}
