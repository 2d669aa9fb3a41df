//! Calendar component types.
//!
//! A [`CalendarComponent`] is the editable representation of a VEVENT, VTODO or
//! VJOURNAL. It is a plain value: every stage of the save pipeline works on its
//! own clone and hands the result back by value.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of calendar component being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Event,
    Task,
    Memo,
}

impl ComponentKind {
    /// iCalendar component name (VEVENT, VTODO, VJOURNAL)
    pub fn ics_name(&self) -> &'static str {
        match self {
            ComponentKind::Event => "VEVENT",
            ComponentKind::Task => "VTODO",
            ComponentKind::Memo => "VJOURNAL",
        }
    }

    pub fn from_ics_name(name: &str) -> Option<Self> {
        match name {
            "VEVENT" => Some(ComponentKind::Event),
            "VTODO" => Some(ComponentKind::Task),
            "VJOURNAL" => Some(ComponentKind::Memo),
            _ => None,
        }
    }

    /// Noun used in alert identifiers, e.g. `calendar:failed-create-event`.
    pub fn alert_noun(&self) -> &'static str {
        match self {
            ComponentKind::Event => "event",
            ComponentKind::Task => "task",
            ComponentKind::Memo => "memo",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.alert_noun())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn tzid(&self) -> Option<&str> {
        match self {
            EventTime::DateTimeZoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTimeUtc(dt) => dt.date_naive(),
            EventTime::DateTimeFloating(dt) => dt.date(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.date(),
        }
    }

    /// Move to another day, keeping the time of day and timezone.
    pub fn with_date(&self, date: NaiveDate) -> EventTime {
        match self {
            EventTime::Date(_) => EventTime::Date(date),
            EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(date.and_time(dt.time()).and_utc()),
            EventTime::DateTimeFloating(dt) => EventTime::DateTimeFloating(date.and_time(dt.time())),
            EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
                datetime: date.and_time(datetime.time()),
                tzid: tzid.clone(),
            },
        }
    }

    pub fn add_days(&self, days: i64) -> EventTime {
        self.with_date(self.date() + Duration::days(days))
    }

    /// Value part of the iCalendar representation, used for recurrence-id keys.
    pub fn to_ics_string(&self) -> String {
        match self {
            EventTime::Date(d) => d.format("%Y%m%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            EventTime::DateTimeFloating(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.format("%Y%m%dT%H%M%S").to_string(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipationStatus {
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
    Delegated,
}

impl ParticipationStatus {
    pub fn as_ics_str(&self) -> &'static str {
        match self {
            ParticipationStatus::NeedsAction => "NEEDS-ACTION",
            ParticipationStatus::Accepted => "ACCEPTED",
            ParticipationStatus::Declined => "DECLINED",
            ParticipationStatus::Tentative => "TENTATIVE",
            ParticipationStatus::Delegated => "DELEGATED",
        }
    }

    pub fn from_ics_str(s: &str) -> Option<Self> {
        match s {
            "NEEDS-ACTION" => Some(ParticipationStatus::NeedsAction),
            "ACCEPTED" => Some(ParticipationStatus::Accepted),
            "DECLINED" => Some(ParticipationStatus::Declined),
            "TENTATIVE" => Some(ParticipationStatus::Tentative),
            "DELEGATED" => Some(ParticipationStatus::Delegated),
            _ => None,
        }
    }
}

/// The ORGANIZER of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    pub email: String,
    pub name: Option<String>,
    /// SENT-BY parameter: someone acting on behalf of the organizer
    pub sent_by: Option<String>,
}

/// An ATTENDEE of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub name: Option<String>,
    pub response_status: Option<ParticipationStatus>,
    pub role: Option<String>,
    pub rsvp: bool,
    pub delegated_from: Option<String>,
    pub delegated_to: Option<String>,
    pub sent_by: Option<String>,
}

impl Attendee {
    pub fn new(email: &str) -> Self {
        Attendee {
            email: strip_mailto(email).to_string(),
            name: None,
            response_status: Some(ParticipationStatus::NeedsAction),
            role: None,
            rsvp: true,
            delegated_from: None,
            delegated_to: None,
            sent_by: None,
        }
    }
}

/// An ATTACH property. URL attachments may point at local files (`file://`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attachment {
    Url(String),
    Inline {
        encoded: String,
        fmttype: Option<String>,
    },
}

impl Attachment {
    pub fn url(&self) -> Option<&str> {
        match self {
            Attachment::Url(url) => Some(url),
            Attachment::Inline { .. } => None,
        }
    }
}

/// A reminder/alarm, in minutes before the start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub minutes: i64,
}

/// Recurrence properties of a master component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    pub rrules: Vec<String>,
    pub rdates: Vec<EventTime>,
    pub exrules: Vec<String>,
    pub exdates: Vec<EventTime>,
}

impl Recurrence {
    pub fn is_empty(&self) -> bool {
        self.rrules.is_empty()
            && self.rdates.is_empty()
            && self.exrules.is_empty()
            && self.exdates.is_empty()
    }
}

/// An event, task or memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarComponent {
    pub kind: ComponentKind,
    pub uid: String,
    /// RECURRENCE-ID, set on detached instances of a recurring series
    pub recurrence_id: Option<EventTime>,
    pub sequence: i64,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
    /// DTEND for events, DUE for tasks; unused by memos
    pub end: Option<EventTime>,
    pub organizer: Option<Organizer>,
    pub attendees: Vec<Attendee>,
    pub recurrence: Recurrence,
    pub attachments: Vec<Attachment>,
    pub reminders: Vec<Reminder>,
    /// LAST-MODIFIED
    pub updated: Option<DateTime<Utc>>,
    /// Unknown X- properties, preserved for round-tripping
    pub custom_properties: Vec<(String, String)>,

    /// Attendee addresses added during the current editing session.
    /// Never written to the store.
    #[serde(skip)]
    pub new_attendees: Vec<String>,
}

impl CalendarComponent {
    pub fn new(kind: ComponentKind) -> Self {
        CalendarComponent {
            kind,
            uid: format!("{}@caledit", uuid::Uuid::new_v4()),
            recurrence_id: None,
            sequence: 0,
            summary: None,
            description: None,
            location: None,
            start: None,
            end: None,
            organizer: None,
            attendees: Vec::new(),
            recurrence: Recurrence::default(),
            attachments: Vec::new(),
            reminders: Vec::new(),
            updated: None,
            custom_properties: Vec::new(),
            new_attendees: Vec::new(),
        }
    }

    /// uid plus recurrence-id, unique within a calendar
    pub fn unique_id(&self) -> String {
        match &self.recurrence_id {
            Some(rid) => format!("{}__{}", self.uid, rid.to_ics_string()),
            None => self.uid.clone(),
        }
    }

    pub fn recurrence_id_string(&self) -> Option<String> {
        self.recurrence_id.as_ref().map(EventTime::to_ics_string)
    }

    /// Whether the component is the master of a series (RRULE or RDATE present).
    pub fn has_recurrences(&self) -> bool {
        !self.recurrence.rrules.is_empty() || !self.recurrence.rdates.is_empty()
    }

    /// Whether the component is a single instance of a series.
    pub fn is_instance(&self) -> bool {
        self.recurrence_id.is_some()
    }

    pub fn has_attendees(&self) -> bool {
        !self.attendees.is_empty()
    }

    pub fn has_organizer(&self) -> bool {
        self.organizer.is_some()
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn has_new_attendees(&self) -> bool {
        !self.new_attendees.is_empty()
    }

    /// Whether a scheduling message would reach anybody besides the organizer.
    pub fn has_recipients(&self) -> bool {
        self.attendees.iter().any(|attendee| match &self.organizer {
            Some(org) => !addresses_equal(&attendee.email, &org.email),
            None => true,
        })
    }

    /// Every TZID referenced by the component's date-time values, UTC excluded.
    pub fn tzids(&self) -> BTreeSet<String> {
        let times = self
            .start
            .iter()
            .chain(self.end.iter())
            .chain(self.recurrence_id.iter())
            .chain(self.recurrence.rdates.iter())
            .chain(self.recurrence.exdates.iter());

        times
            .filter_map(EventTime::tzid)
            .filter(|tzid| !tzid.is_empty() && !tzid.eq_ignore_ascii_case("UTC"))
            .map(str::to_string)
            .collect()
    }

    /// Remove RRULE, RDATE, EXRULE and EXDATE so that only one instance is affected.
    pub fn strip_recurrence(&mut self) {
        self.recurrence = Recurrence::default();
    }

    pub fn attendee(&self, address: &str) -> Option<&Attendee> {
        self.attendees
            .iter()
            .find(|a| addresses_equal(&a.email, address))
    }

    /// Keep only `address` and attendees delegated from it.
    pub fn retain_delegation_chain(&mut self, address: &str) {
        self.attendees.retain(|attendee| {
            addresses_equal(&attendee.email, address)
                || attendee
                    .delegated_from
                    .as_deref()
                    .is_some_and(|from| !from.is_empty() && addresses_equal(from, address))
        });
    }

    /// UID made safe for use as part of a file name.
    pub fn safe_uid(&self) -> String {
        safe_filename(&self.uid)
    }
}

impl fmt::Display for CalendarComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.summary.as_deref().unwrap_or("(No summary)"))
    }
}

/// Strip a leading `mailto:` (any case).
pub fn strip_mailto(address: &str) -> &str {
    let trimmed = address.trim();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => &trimmed[7..],
        _ => trimmed,
    }
}

/// Compare two calendar addresses, ignoring case and any `mailto:` prefix.
pub fn addresses_equal(a: &str, b: &str) -> bool {
    let a = strip_mailto(a);
    let b = strip_mailto(b);
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Replace characters that are unsafe in file names.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
