//! Questions the editor asks the user.

use std::sync::Mutex;

use crate::component::{CalendarComponent, ComponentKind};
use crate::store::{ComponentStore, RecurrenceScope};

/// Whether to send scheduling messages, with the options offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPromptRequest {
    pub kind: ComponentKind,
    pub is_new: bool,
    pub offer_strip_alarms: bool,
    pub offer_only_new_attendees: bool,
}

impl SendPromptRequest {
    pub fn prompt_id(&self) -> &'static str {
        match (self.kind, self.is_new) {
            (ComponentKind::Event, true) => "calendar:prompt-meeting-invite",
            (ComponentKind::Event, false) => "calendar:prompt-send-updated-meeting-info",
            (ComponentKind::Task, true) => "calendar:prompt-send-task",
            (ComponentKind::Task, false) => "calendar:prompt-send-updated-task-info",
            (ComponentKind::Memo, true) => "calendar:prompt-send-memo",
            (ComponentKind::Memo, false) => "calendar:prompt-send-updated-memo-info",
        }
    }
}

/// The user's answer. The default declines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendPromptResult {
    pub proceed: bool,
    pub strip_alarms: bool,
    pub only_new_attendees: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChangesResponse {
    Save,
    Discard,
    Cancel,
}

/// Identifier of the "save changes?" question for a component kind.
pub fn save_changes_prompt_id(kind: ComponentKind, is_meeting: bool) -> &'static str {
    match kind {
        ComponentKind::Event if is_meeting => "calendar:prompt-save-meeting",
        ComponentKind::Event => "calendar:prompt-save-appointment",
        ComponentKind::Task => "calendar:prompt-save-task",
        ComponentKind::Memo => "calendar:prompt-save-memo",
    }
}

/// Answers the editor's questions. Implementations block until the user
/// has answered.
pub trait Prompter: Send + Sync {
    fn send_component(&self, request: &SendPromptRequest) -> SendPromptResult;

    /// Which instances an edit of `comp` applies to; `None` cancels the save.
    /// "This and future" is only offered when `store` supports it.
    fn recurrence_scope(
        &self,
        comp: &CalendarComponent,
        store: &dyn ComponentStore,
    ) -> Option<RecurrenceScope>;

    /// Whether to save a component without a summary.
    fn prompt_subject(&self, kind: ComponentKind) -> bool;

    fn save_changes(&self, kind: ComponentKind, is_meeting: bool) -> SaveChangesResponse;
}

/// Prompter with canned answers that records the send requests it saw.
#[derive(Debug)]
pub struct ScriptedPrompter {
    pub send: SendPromptResult,
    pub scope: Option<RecurrenceScope>,
    pub save_without_subject: bool,
    pub save_changes: SaveChangesResponse,
    pub requests: Mutex<Vec<SendPromptRequest>>,
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        ScriptedPrompter {
            send: SendPromptResult {
                proceed: true,
                strip_alarms: false,
                only_new_attendees: false,
            },
            scope: Some(RecurrenceScope::This),
            save_without_subject: true,
            save_changes: SaveChangesResponse::Save,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedPrompter {
    pub fn requests(&self) -> Vec<SendPromptRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Prompter for ScriptedPrompter {
    fn send_component(&self, request: &SendPromptRequest) -> SendPromptResult {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(*request),
            Err(e) => e.into_inner().push(*request),
        }
        self.send
    }

    fn recurrence_scope(
        &self,
        _comp: &CalendarComponent,
        _store: &dyn ComponentStore,
    ) -> Option<RecurrenceScope> {
        self.scope
    }

    fn prompt_subject(&self, _kind: ComponentKind) -> bool {
        self.save_without_subject
    }

    fn save_changes(&self, _kind: ComponentKind, _is_meeting: bool) -> SaveChangesResponse {
        self.save_changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_ids_depend_on_kind_and_novelty() {
        let request = SendPromptRequest {
            kind: ComponentKind::Task,
            is_new: false,
            offer_strip_alarms: false,
            offer_only_new_attendees: false,
        };
        assert_eq!(request.prompt_id(), "calendar:prompt-send-updated-task-info");
        assert_eq!(
            SendPromptRequest { is_new: true, kind: ComponentKind::Event, ..request }.prompt_id(),
            "calendar:prompt-meeting-invite"
        );
        assert_eq!(
            save_changes_prompt_id(ComponentKind::Event, false),
            "calendar:prompt-save-appointment"
        );
    }

    #[test]
    fn default_answer_declines() {
        assert!(!SendPromptResult::default().proceed);
    }
}
