//! Answering the editor's questions on the terminal.

use dialoguer::{Confirm, Select};

use caledit_core::component::CalendarComponent;
use caledit_core::editor::{
    Prompter, SaveChangesResponse, SendPromptRequest, SendPromptResult,
};
use caledit_core::store::{Capability, ComponentStore};
use caledit_core::{ComponentKind, RecurrenceScope};

/// Asks with dialoguer, or takes every default when `assume_yes` is set.
/// A prompt that cannot be shown (no terminal) counts as declined.
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        TerminalPrompter { assume_yes }
    }

    fn confirm(&self, prompt: &str, default: bool) -> bool {
        if self.assume_yes {
            return default;
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .unwrap_or(false)
    }
}

fn send_question(request: &SendPromptRequest) -> String {
    let noun = match request.kind {
        ComponentKind::Event => "meeting",
        ComponentKind::Task => "task",
        ComponentKind::Memo => "memo",
    };
    if request.is_new {
        format!("  Send the {} to its attendees?", noun)
    } else {
        format!("  Send the updated {} to its attendees?", noun)
    }
}

fn scope_choices(store: &dyn ComponentStore) -> Vec<(&'static str, RecurrenceScope)> {
    let mut choices = vec![("This occurrence", RecurrenceScope::This)];
    if !store.check_capability(Capability::NoThisAndFuture) {
        choices.push(("This and future occurrences", RecurrenceScope::ThisAndFuture));
    }
    choices.push(("All occurrences", RecurrenceScope::All));
    choices
}

impl Prompter for TerminalPrompter {
    fn send_component(&self, request: &SendPromptRequest) -> SendPromptResult {
        let proceed = self.confirm(&send_question(request), true);
        if !proceed {
            return SendPromptResult::default();
        }

        SendPromptResult {
            proceed,
            strip_alarms: request.offer_strip_alarms
                && self.confirm("  Leave your reminders out of the message?", true),
            only_new_attendees: request.offer_only_new_attendees
                && self.confirm("  Notify only the attendees you added?", false),
        }
    }

    fn recurrence_scope(
        &self,
        comp: &CalendarComponent,
        store: &dyn ComponentStore,
    ) -> Option<RecurrenceScope> {
        if self.assume_yes {
            return Some(RecurrenceScope::This);
        }

        let choices = scope_choices(store);
        let labels: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
        let selection = Select::new()
            .with_prompt(format!("  '{}' repeats. Change", comp))
            .items(&labels)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()?;
        choices.get(selection).map(|(_, scope)| *scope)
    }

    fn prompt_subject(&self, kind: ComponentKind) -> bool {
        self.confirm(&format!("  Save the {} without a summary?", kind), false)
    }

    fn save_changes(&self, kind: ComponentKind, is_meeting: bool) -> SaveChangesResponse {
        if self.assume_yes {
            return SaveChangesResponse::Save;
        }

        let what = if is_meeting { "meeting".to_string() } else { kind.to_string() };
        let choices = [
            ("Save", SaveChangesResponse::Save),
            ("Discard", SaveChangesResponse::Discard),
            ("Cancel", SaveChangesResponse::Cancel),
        ];
        let labels: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
        match Select::new()
            .with_prompt(format!("  The {} has unsaved changes", what))
            .items(&labels)
            .default(0)
            .interact_opt()
        {
            Ok(Some(selection)) => choices[selection].1,
            _ => SaveChangesResponse::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caledit_core::store::MemoryStore;

    #[test]
    fn assume_yes_takes_defaults() {
        let prompter = TerminalPrompter::new(true);
        let request = SendPromptRequest {
            kind: ComponentKind::Event,
            is_new: true,
            offer_strip_alarms: true,
            offer_only_new_attendees: true,
        };

        let result = prompter.send_component(&request);
        assert!(result.proceed);
        assert!(result.strip_alarms);
        assert!(!result.only_new_attendees);

        assert!(!prompter.prompt_subject(ComponentKind::Task));
        assert_eq!(
            prompter.save_changes(ComponentKind::Memo, false),
            SaveChangesResponse::Save
        );
        let comp = CalendarComponent::new(ComponentKind::Event);
        let store = MemoryStore::new("work", "Work");
        assert_eq!(
            prompter.recurrence_scope(&comp, &store),
            Some(RecurrenceScope::This)
        );
    }

    #[test]
    fn this_and_future_is_offered_only_where_supported() {
        let scopes = |store: &MemoryStore| -> Vec<RecurrenceScope> {
            scope_choices(store).into_iter().map(|(_, scope)| scope).collect()
        };

        let splitting = MemoryStore::new("remote", "Remote");
        assert_eq!(
            scopes(&splitting),
            vec![
                RecurrenceScope::This,
                RecurrenceScope::ThisAndFuture,
                RecurrenceScope::All
            ]
        );
        let plain = MemoryStore::new("work", "Work").with_capability(Capability::NoThisAndFuture);
        assert_eq!(scopes(&plain), vec![RecurrenceScope::This, RecurrenceScope::All]);
    }

    #[test]
    fn send_question_mentions_update() {
        let mut request = SendPromptRequest {
            kind: ComponentKind::Task,
            is_new: true,
            offer_strip_alarms: false,
            offer_only_new_attendees: false,
        };
        assert!(send_question(&request).contains("the task"));
        request.is_new = false;
        assert!(send_question(&request).contains("updated task"));
    }
}
