//! Pending field values of an open editor.

use crate::component::{Attachment, Attendee, EventTime, Organizer, Reminder, addresses_equal};

/// What the user currently sees in the editor. Folded into a copy of the
/// live component on save, refilled from the stored component afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorForm {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: Option<EventTime>,
    /// End for events, due date for tasks
    pub end: Option<EventTime>,
    pub organizer: Option<Organizer>,
    pub attendees: Vec<Attendee>,
    pub attachments: Vec<Attachment>,
    pub reminders: Vec<Reminder>,
    /// Addresses added since the editor was opened or last saved
    pub added_attendees: Vec<String>,
}

impl EditorForm {
    /// Add an attendee unless one with the same address is present.
    pub fn add_attendee(&mut self, attendee: Attendee) {
        if self
            .attendees
            .iter()
            .any(|a| addresses_equal(&a.email, &attendee.email))
        {
            return;
        }
        self.added_attendees.push(attendee.email.clone());
        self.attendees.push(attendee);
    }

    pub fn remove_attendee(&mut self, email: &str) {
        self.attendees.retain(|a| !addresses_equal(&a.email, email));
        self.added_attendees.retain(|a| !addresses_equal(a, email));
    }

    pub fn attach(&mut self, url: impl Into<String>) {
        self.attachments.push(Attachment::Url(url.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_attendees_track_session_changes() {
        let mut form = EditorForm {
            attendees: vec![Attendee::new("alice@example.com")],
            ..EditorForm::default()
        };

        form.add_attendee(Attendee::new("bob@example.com"));
        form.add_attendee(Attendee::new("MAILTO:Alice@example.com"));
        assert_eq!(form.attendees.len(), 2);
        assert_eq!(form.added_attendees, vec!["bob@example.com"]);

        form.remove_attendee("bob@example.com");
        assert!(form.added_attendees.is_empty());
        assert_eq!(form.attendees.len(), 1);
    }
}
