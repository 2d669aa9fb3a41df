//! Colored terminal rendering for caledit-core types.

use caledit_core::component::{Attachment, CalendarComponent, ParticipationStatus};
use caledit_core::{Alert, ComponentKind, EditorEvent};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarComponent {
    fn render(&self) -> String {
        let icon = match self.kind {
            ComponentKind::Event => "📅",
            ComponentKind::Task => "☑",
            ComponentKind::Memo => "📝",
        };
        let mut lines = vec![format!("{} {}", icon, self.to_string().bold())];

        if let Some(ref rid) = self.recurrence_id {
            lines.push(format!("   {} {}", "occurrence".dimmed(), rid));
        }
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => lines.push(format!("   {} → {}", start, end).dimmed().to_string()),
            (Some(start), None) => lines.push(format!("   {}", start).dimmed().to_string()),
            (None, Some(due)) => lines.push(format!("   due {}", due).dimmed().to_string()),
            (None, None) => {}
        }
        if !self.recurrence.rrules.is_empty() {
            lines.push(format!("   {} {}", "repeats".dimmed(), self.recurrence.rrules.join(", ")));
        }
        if let Some(ref location) = self.location {
            lines.push(format!("   📍 {}", location));
        }
        if let Some(ref organizer) = self.organizer {
            lines.push(format!("   {} {}", "organizer".dimmed(), organizer.email));
        }
        for attendee in &self.attendees {
            let status = match attendee.response_status {
                Some(ParticipationStatus::Accepted) => "✓".green().to_string(),
                Some(ParticipationStatus::Declined) => "✗".red().to_string(),
                Some(ParticipationStatus::Tentative) => "?".yellow().to_string(),
                Some(ParticipationStatus::Delegated) => "→".cyan().to_string(),
                _ => "·".dimmed().to_string(),
            };
            lines.push(format!("   {} {}", status, attendee.email));
        }
        for attachment in &self.attachments {
            let label = match attachment {
                Attachment::Url(url) => url.clone(),
                Attachment::Inline { fmttype, .. } => {
                    format!("inline {}", fmttype.as_deref().unwrap_or("data"))
                }
            };
            lines.push(format!("   📎 {}", label));
        }
        if let Some(ref description) = self.description {
            lines.push(String::new());
            lines.extend(description.lines().map(|l| format!("   {}", l)));
        }

        lines.join("\n")
    }
}

impl Render for Alert {
    fn render(&self) -> String {
        let mut text = describe(self);
        if let Some(ref detail) = self.detail {
            text = format!("{}: {}", text, detail);
        }
        if self.id.starts_with("calendar:prompt-") {
            format!("  {}", text.yellow())
        } else {
            format!("  {}", text.red())
        }
    }
}

/// Human wording for an alert identifier.
fn describe(alert: &Alert) -> String {
    let calendar = alert.argument.as_deref().unwrap_or("the calendar");
    let Some(rest) = alert.id.strip_prefix("calendar:") else {
        return alert.id.clone();
    };

    match rest {
        "failed-add-timezone" => "Could not add a timezone to the calendar".to_string(),
        "failed-save-attachments" => "Could not copy attachments".to_string(),
        "failed-open-calendar" => format!("Could not open {}", calendar),
        "comp-editor-failed-validate" => "Invalid values".to_string(),
        "prompt-read-only-cal-editor" => format!("{} is read-only", calendar),
        "prompt-no-task-assignment-editor" => {
            format!("{} does not support assigned tasks", calendar)
        }
        _ => match rest.strip_prefix("failed-").and_then(|r| r.split_once('-')) {
            Some(("send", noun)) => format!("Could not send the {} from {}", noun, calendar),
            Some((operation, noun)) => format!("Could not {} the {}", operation, noun),
            None => alert.id.clone(),
        },
    }
}

/// One line for an editor event, or nothing for events the user needn't see.
pub fn render_event(event: &EditorEvent) -> Option<String> {
    match event {
        EditorEvent::ObjectCreated => Some(format!("  {}", "Created".green())),
        EditorEvent::EditorClosed { saved: true } => Some(format!("  {}", "Saved".green())),
        EditorEvent::Alert(alert) => Some(alert.render()),
        EditorEvent::EditorClosed { saved: false }
        | EditorEvent::BusyChanged(_)
        | EditorEvent::ChangedChanged(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_operation_alerts_read_naturally() {
        let alert = Alert::failed("modify", ComponentKind::Task);
        assert_eq!(describe(&alert), "Could not modify the task");

        let alert = Alert::failed("send", ComponentKind::Event).with_argument("Work");
        assert_eq!(describe(&alert), "Could not send the event from Work");
    }

    #[test]
    fn prompt_alerts_name_the_calendar() {
        let alert = Alert::new("calendar:prompt-read-only-cal-editor").with_argument("Holidays");
        assert_eq!(describe(&alert), "Holidays is read-only");
    }

    #[test]
    fn unknown_ids_pass_through() {
        let alert = Alert::new("other:thing");
        assert_eq!(describe(&alert), "other:thing");
    }

    #[test]
    fn quiet_events_render_nothing() {
        assert!(render_event(&EditorEvent::BusyChanged(true)).is_none());
        assert!(render_event(&EditorEvent::EditorClosed { saved: true }).is_some());
    }

    #[test]
    fn component_shows_attendees() {
        let mut comp = CalendarComponent::new(ComponentKind::Event);
        comp.summary = Some("Planning".into());
        comp.attendees
            .push(caledit_core::component::Attendee::new("mailto:bob@example.com"));

        let out = comp.render();
        assert!(out.contains("Planning"));
        assert!(out.contains("bob@example.com"));
    }
}
