//! Per-kind editor behaviour.

use chrono::NaiveDateTime;

use super::{EditorFlags, EditorForm};
use crate::component::{CalendarComponent, ComponentKind, EventTime};
use crate::store::{Capability, ComponentStore};

/// Which parts of the editor accept input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sensitivity {
    pub editable: bool,
    pub organizer: bool,
    pub attendees: bool,
}

/// The pages of an editor: how they enable themselves, load a component
/// and write it back.
pub trait EditorPage {
    fn sensitize(&self, store: &dyn ComponentStore, flags: EditorFlags, busy: bool) -> Sensitivity;

    fn fill_widgets(&self, comp: &CalendarComponent, form: &mut EditorForm);

    /// Write the form into `comp`. The error is a message for the user.
    fn fill_component(&self, form: &EditorForm, comp: &mut CalendarComponent) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorKind {
    Event,
    Task,
    Memo,
}

impl From<ComponentKind> for EditorKind {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Event => EditorKind::Event,
            ComponentKind::Task => EditorKind::Task,
            ComponentKind::Memo => EditorKind::Memo,
        }
    }
}

impl EditorKind {
    pub fn component_kind(&self) -> ComponentKind {
        match self {
            EditorKind::Event => ComponentKind::Event,
            EditorKind::Task => ComponentKind::Task,
            EditorKind::Memo => ComponentKind::Memo,
        }
    }
}

fn sort_key(time: &EventTime) -> NaiveDateTime {
    match time {
        EventTime::Date(d) => d.and_time(chrono::NaiveTime::default()),
        EventTime::DateTimeUtc(dt) => dt.naive_utc(),
        EventTime::DateTimeFloating(dt) => *dt,
        EventTime::DateTimeZoned { datetime, .. } => *datetime,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl EditorPage for EditorKind {
    fn sensitize(&self, store: &dyn ComponentStore, flags: EditorFlags, busy: bool) -> Sensitivity {
        let editable = !busy && !store.is_readonly();
        let organizes = flags.user_org || flags.new_item;
        let organizer = editable && flags.new_item && !store.check_capability(Capability::NoOrganizer);

        let attendees = match self {
            EditorKind::Event => editable && flags.meeting && (organizes || flags.delegate),
            EditorKind::Task => {
                editable
                    && flags.meeting
                    && (organizes || flags.delegate)
                    && !store.check_capability(Capability::NoTaskAssignment)
            }
            EditorKind::Memo => editable && flags.meeting && organizes,
        };

        Sensitivity {
            editable,
            organizer,
            attendees,
        }
    }

    fn fill_widgets(&self, comp: &CalendarComponent, form: &mut EditorForm) {
        *form = EditorForm {
            summary: comp.summary.clone().unwrap_or_default(),
            description: comp.description.clone().unwrap_or_default(),
            location: comp.location.clone().unwrap_or_default(),
            start: comp.start.clone(),
            end: match self {
                EditorKind::Memo => None,
                EditorKind::Event | EditorKind::Task => comp.end.clone(),
            },
            organizer: comp.organizer.clone(),
            attendees: comp.attendees.clone(),
            attachments: comp.attachments.clone(),
            reminders: comp.reminders.clone(),
            added_attendees: Vec::new(),
        };
    }

    fn fill_component(&self, form: &EditorForm, comp: &mut CalendarComponent) -> Result<(), String> {
        match self {
            EditorKind::Event => {
                let Some(ref start) = form.start else {
                    return Err("An event needs a start time".to_string());
                };
                if let Some(ref end) = form.end {
                    if start.is_date() != end.is_date() {
                        return Err("Start and end must both be all-day or both be timed".to_string());
                    }
                    if sort_key(end) < sort_key(start) {
                        return Err("The event ends before it starts".to_string());
                    }
                }
            }
            EditorKind::Task => {
                if let (Some(start), Some(due)) = (&form.start, &form.end) {
                    if sort_key(due) < sort_key(start) {
                        return Err("The due date is before the start date".to_string());
                    }
                }
            }
            EditorKind::Memo => {}
        }

        comp.summary = non_empty(&form.summary);
        comp.description = non_empty(&form.description);
        comp.location = non_empty(&form.location);
        comp.start = form.start.clone();
        comp.end = match self {
            EditorKind::Memo => None,
            EditorKind::Event | EditorKind::Task => form.end.clone(),
        };
        comp.organizer = form.organizer.clone();
        comp.attendees = form.attendees.clone();
        comp.attachments = form.attachments.clone();
        comp.reminders = form.reminders.clone();
        Ok(())
    }
}
