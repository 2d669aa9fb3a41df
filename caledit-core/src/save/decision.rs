//! Whether to send scheduling messages after a save, and which.

use crate::component::{CalendarComponent, ComponentKind};
use crate::editor::{SendPromptRequest, SendPromptResult};
use crate::itip::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationPlan {
    pub first_method: Method,
    pub second_method: Option<Method>,
    pub strip_alarms: bool,
    pub only_new_attendees: bool,
}

impl Default for NotificationPlan {
    fn default() -> Self {
        NotificationPlan {
            first_method: Method::Request,
            second_method: None,
            strip_alarms: false,
            only_new_attendees: false,
        }
    }
}

/// Everything the decision depends on besides the prompt.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub component: &'a CalendarComponent,
    /// The editor was opened to delegate the component
    pub delegate: bool,
    /// The target calendar's backend sends messages itself
    pub saves_schedules: bool,
    pub with_send: bool,
    /// The user is the organizer or acts for them (SENT-BY)
    pub user_is_organizer: bool,
    pub is_new: bool,
}

/// Decide on a plan, calling `prompt` only when the user has a say.
pub fn decide(
    input: DecisionInput<'_>,
    prompt: impl FnOnce(&SendPromptRequest) -> SendPromptResult,
) -> Option<NotificationPlan> {
    let (first_method, second_method) = methods(&input);

    if input.delegate && input.saves_schedules {
        return Some(NotificationPlan {
            first_method,
            second_method,
            strip_alarms: true,
            only_new_attendees: false,
        });
    }

    if !input.with_send || input.saves_schedules || !input.component.has_recipients() {
        return None;
    }

    let request = SendPromptRequest {
        kind: input.component.kind,
        is_new: input.is_new,
        offer_strip_alarms: !input.component.reminders.is_empty(),
        offer_only_new_attendees: input.component.has_new_attendees(),
    };
    let answer = prompt(&request);
    if !answer.proceed {
        return None;
    }

    Some(NotificationPlan {
        first_method,
        second_method,
        // Reminders stay out of the message unless the user chose to keep them.
        strip_alarms: !request.offer_strip_alarms || answer.strip_alarms,
        only_new_attendees: request.offer_only_new_attendees && answer.only_new_attendees,
    })
}

fn methods(input: &DecisionInput<'_>) -> (Method, Option<Method>) {
    if input.user_is_organizer {
        let first = match input.component.kind {
            ComponentKind::Memo => Method::Publish,
            ComponentKind::Event | ComponentKind::Task => Method::Request,
        };
        (first, None)
    } else {
        (Method::Request, input.delegate.then_some(Method::Reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Attendee, Organizer, Reminder};
    use std::cell::Cell;

    fn meeting(kind: ComponentKind) -> CalendarComponent {
        let mut comp = CalendarComponent::new(kind);
        comp.organizer = Some(Organizer {
            email: "alice@example.com".to_string(),
            name: None,
            sent_by: None,
        });
        comp.attendees = vec![Attendee::new("bob@example.com")];
        comp
    }

    fn input(comp: &CalendarComponent) -> DecisionInput<'_> {
        DecisionInput {
            component: comp,
            delegate: false,
            saves_schedules: false,
            with_send: true,
            user_is_organizer: true,
            is_new: false,
        }
    }

    fn yes(_: &SendPromptRequest) -> SendPromptResult {
        SendPromptResult {
            proceed: true,
            strip_alarms: true,
            only_new_attendees: true,
        }
    }

    #[test]
    fn organizer_sends_request_only() {
        let comp = meeting(ComponentKind::Event);
        let plan = decide(input(&comp), yes).unwrap();
        assert_eq!(plan.first_method, Method::Request);
        assert_eq!(plan.second_method, None);
    }

    #[test]
    fn organizer_publishes_memos() {
        let comp = meeting(ComponentKind::Memo);
        let plan = decide(input(&comp), yes).unwrap();
        assert_eq!(plan.first_method, Method::Publish);
    }

    #[test]
    fn non_organizer_without_delegate_has_no_second_method() {
        let comp = meeting(ComponentKind::Task);
        let plan = decide(
            DecisionInput {
                user_is_organizer: false,
                ..input(&comp)
            },
            yes,
        )
        .unwrap();
        assert_eq!(plan.first_method, Method::Request);
        assert_eq!(plan.second_method, None);
    }

    #[test]
    fn delegate_on_scheduling_backend_skips_prompt() {
        let comp = meeting(ComponentKind::Event);
        let prompted = Cell::new(false);

        let plan = decide(
            DecisionInput {
                delegate: true,
                saves_schedules: true,
                with_send: false,
                user_is_organizer: false,
                ..input(&comp)
            },
            |req| {
                prompted.set(true);
                yes(req)
            },
        )
        .unwrap();

        assert!(!prompted.get());
        assert_eq!(plan.second_method, Some(Method::Reply));
        assert!(plan.strip_alarms);
        assert!(!plan.only_new_attendees);
    }

    #[test]
    fn no_plan_without_send_recipients_or_consent() {
        let comp = meeting(ComponentKind::Event);
        let never = |_: &SendPromptRequest| -> SendPromptResult { panic!("should not prompt") };

        assert!(decide(DecisionInput { with_send: false, ..input(&comp) }, never).is_none());
        assert!(
            decide(DecisionInput { saves_schedules: true, ..input(&comp) }, never).is_none()
        );

        let lonely = CalendarComponent::new(ComponentKind::Event);
        assert!(decide(input(&lonely), never).is_none());

        let declined = decide(input(&comp), |_| SendPromptResult::default());
        assert!(declined.is_none());
    }

    #[test]
    fn prompt_options_offered_only_when_relevant() {
        let mut comp = meeting(ComponentKind::Event);
        let plan = decide(input(&comp), |req| {
            assert!(!req.offer_strip_alarms);
            assert!(!req.offer_only_new_attendees);
            yes(req)
        })
        .unwrap();
        assert!(plan.strip_alarms);
        assert!(!plan.only_new_attendees);

        comp.reminders = vec![Reminder { minutes: 10 }];
        comp.new_attendees = vec!["bob@example.com".to_string()];
        let plan = decide(input(&comp), |req| {
            assert!(req.offer_strip_alarms);
            assert!(req.offer_only_new_attendees);
            yes(req)
        })
        .unwrap();
        assert!(plan.strip_alarms);
        assert!(plan.only_new_attendees);
    }

    #[test]
    fn alarms_are_stripped_unless_the_user_keeps_them() {
        let proceed_only = |_: &SendPromptRequest| SendPromptResult {
            proceed: true,
            ..SendPromptResult::default()
        };
        let mut comp = meeting(ComponentKind::Task);

        let plan = decide(input(&comp), proceed_only).unwrap();
        assert!(plan.strip_alarms);

        comp.reminders = vec![Reminder { minutes: 30 }];
        let plan = decide(input(&comp), proceed_only).unwrap();
        assert!(!plan.strip_alarms);
    }
}
