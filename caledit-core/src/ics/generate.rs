//! ICS generation.
//!
//! Every component kind is built as an `icalendar::Event` and renamed during
//! post-processing, so tasks and memos share one property writer.

use crate::component::{Attachment, CalendarComponent, ComponentKind, EventTime};
use crate::error::CalEditResult;
use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};

pub const PRODID: &str = "-//caledit//caledit//EN";

/// Generate .ics content for a component, as stored in a calendar
pub fn generate_ics(comp: &CalendarComponent) -> CalEditResult<String> {
    Ok(render(comp, None))
}

/// Generate an iTIP message (RFC 5546) carrying `method`
pub fn generate_itip(method: &str, comp: &CalendarComponent) -> CalEditResult<String> {
    Ok(render(comp, Some(method)))
}

fn render(comp: &CalendarComponent, method: Option<&str>) -> String {
    let mut cal = Calendar::new();
    cal.push(build_component(comp));
    let cal = cal.done();

    post_process(&cal.to_string(), comp.kind, method)
}

fn build_component(comp: &CalendarComponent) -> icalendar::Event {
    let mut ics = icalendar::Event::new();
    ics.uid(&comp.uid);

    if let Some(ref summary) = comp.summary {
        ics.summary(summary);
    }

    let dtstamp = comp
        .updated
        .unwrap_or_else(chrono::Utc::now)
        .format("%Y%m%dT%H%M%SZ")
        .to_string();
    ics.add_property("DTSTAMP", &dtstamp);

    if let Some(updated) = comp.updated {
        ics.add_property("LAST-MODIFIED", updated.format("%Y%m%dT%H%M%SZ").to_string());
    }

    ics.add_property("SEQUENCE", comp.sequence.to_string());

    if let Some(ref start) = comp.start {
        add_datetime_property(&mut ics, "DTSTART", start);
    }
    match (comp.kind, &comp.end) {
        (ComponentKind::Event, Some(end)) => add_datetime_property(&mut ics, "DTEND", end),
        (ComponentKind::Task, Some(due)) => add_datetime_property(&mut ics, "DUE", due),
        _ => {}
    }

    if let Some(ref desc) = comp.description {
        ics.description(desc);
    }
    if let Some(ref loc) = comp.location {
        ics.location(loc);
    }

    if let Some(ref recurrence_id) = comp.recurrence_id {
        add_datetime_property(&mut ics, "RECURRENCE-ID", recurrence_id);
    }

    for rrule in &comp.recurrence.rrules {
        ics.append_multi_property(Property::new("RRULE", rrule));
    }
    for exrule in &comp.recurrence.exrules {
        ics.append_multi_property(Property::new("EXRULE", exrule));
    }
    for rdate in &comp.recurrence.rdates {
        add_date_list_property(&mut ics, "RDATE", rdate);
    }
    for exdate in &comp.recurrence.exdates {
        add_date_list_property(&mut ics, "EXDATE", exdate);
    }

    for reminder in &comp.reminders {
        let trigger = Trigger::before_start(chrono::Duration::minutes(reminder.minutes));
        ics.alarm(Alarm::display("Reminder", trigger));
    }

    if let Some(ref org) = comp.organizer {
        let mut prop = Property::new("ORGANIZER", format!("mailto:{}", org.email));
        if let Some(ref name) = org.name {
            prop.add_parameter("CN", name);
        }
        if let Some(ref sent_by) = org.sent_by {
            prop.add_parameter("SENT-BY", &format!("mailto:{}", sent_by));
        }
        ics.append_property(prop);
    }

    for attendee in &comp.attendees {
        let mut prop = Property::new("ATTENDEE", format!("mailto:{}", attendee.email));
        if let Some(ref name) = attendee.name {
            prop.add_parameter("CN", name);
        }
        if let Some(ref role) = attendee.role {
            prop.add_parameter("ROLE", role);
        }
        if let Some(partstat) = attendee.response_status {
            prop.add_parameter("PARTSTAT", partstat.as_ics_str());
        }
        if attendee.rsvp {
            prop.add_parameter("RSVP", "TRUE");
        }
        if let Some(ref from) = attendee.delegated_from {
            prop.add_parameter("DELEGATED-FROM", &format!("mailto:{}", from));
        }
        if let Some(ref to) = attendee.delegated_to {
            prop.add_parameter("DELEGATED-TO", &format!("mailto:{}", to));
        }
        if let Some(ref sent_by) = attendee.sent_by {
            prop.add_parameter("SENT-BY", &format!("mailto:{}", sent_by));
        }
        ics.append_multi_property(prop);
    }

    for attachment in &comp.attachments {
        match attachment {
            Attachment::Url(url) => {
                ics.append_multi_property(Property::new("ATTACH", url));
            }
            Attachment::Inline { encoded, fmttype } => {
                let mut prop = Property::new("ATTACH", encoded);
                prop.add_parameter("ENCODING", "BASE64");
                prop.add_parameter("VALUE", "BINARY");
                if let Some(fmttype) = fmttype {
                    prop.add_parameter("FMTTYPE", fmttype);
                }
                ics.append_multi_property(prop);
            }
        }
    }

    for (key, value) in &comp.custom_properties {
        ics.add_property(key, value);
    }

    ics.done()
}

/// Clean up output from the icalendar crate
/// - Replace PRODID, add METHOD for iTIP messages
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Rename VEVENT to the component's real name
/// - Remove DTSTAMP and UID inside VALARM sections
fn post_process(ics: &str, kind: ComponentKind, method: Option<&str>) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str(&format!("PRODID:{}\r\n", PRODID));
            if let Some(method) = method {
                result.push_str(&format!("METHOD:{}\r\n", method));
            }
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        match line {
            "BEGIN:VEVENT" => {
                result.push_str(&format!("BEGIN:{}\r\n", kind.ics_name()));
                continue;
            }
            "END:VEVENT" => {
                result.push_str(&format!("END:{}\r\n", kind.ics_name()));
                continue;
            }
            "BEGIN:VALARM" => in_valarm = true,
            "END:VALARM" => in_valarm = false,
            _ => {}
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

/// Add a datetime property with proper formatting based on EventTime variant
fn add_datetime_property(ics: &mut icalendar::Event, name: &str, time: &EventTime) {
    ics.append_property(time_property(name, time));
}

/// Add one value of a property that may repeat (RDATE, EXDATE)
fn add_date_list_property(ics: &mut icalendar::Event, name: &str, time: &EventTime) {
    ics.append_multi_property(time_property(name, time));
}

fn time_property(name: &str, time: &EventTime) -> Property {
    match time {
        EventTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            prop
        }
        EventTime::DateTimeZoned { tzid, .. } => {
            let mut prop = Property::new(name, time.to_ics_string());
            prop.add_parameter("TZID", tzid);
            prop
        }
        EventTime::DateTimeUtc(_) | EventTime::DateTimeFloating(_) => {
            Property::new(name, time.to_ics_string())
        }
    }
}
