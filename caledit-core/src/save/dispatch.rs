//! Send the scheduling messages a persisted save calls for.
//!
//! The editor owner creates the [`Activity`] after spawning this stage and
//! hands it over through a oneshot channel. A write that already happened is
//! never reverted, whatever the outcome here.

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use super::{JobOutcome, NotifyJob, SaveErrorKind, SaveFailure, attachments};
use crate::activity::Activity;
use crate::alert::Alert;
use crate::component::{CalendarComponent, ComponentKind};
use crate::identity::Identity;
use crate::itip::{Method, SendError, TransportHandle};
use crate::store::{Capability, ComponentStore, RecurrenceScope};

#[derive(Debug)]
enum DispatchState {
    SendingFirst,
    SendingSecond(Method),
    Done,
    Failed(SaveFailure),
}

fn send_failure(target: &dyn ComponentStore, kind: ComponentKind, error: &SendError) -> SaveFailure {
    let alert = Alert::failed("send", kind).with_argument(target.display_name());
    if *error == SendError::Cancelled {
        SaveFailure::cancelled(SaveErrorKind::NotificationSendFailed, alert)
    } else {
        SaveFailure::new(
            SaveErrorKind::NotificationSendFailed,
            alert.with_detail(error.to_string()),
        )
    }
}

#[instrument(skip_all, fields(uid = %job.send_component.uid, first = %job.plan.first_method))]
pub async fn run(
    mut job: NotifyJob,
    handoff: oneshot::Receiver<Activity>,
    transport: TransportHandle,
    identity: Identity,
) -> JobOutcome {
    let kind = job.send_component.kind;
    let target = job.persisted.ctx.target.clone();

    let Ok(activity) = handoff.await else {
        warn!("Activity handle was dropped before sending");
        let failure = SaveFailure::new(
            SaveErrorKind::NotificationSendFailed,
            Alert::failed("send", kind)
                .with_argument(target.display_name())
                .with_detail("Sending was abandoned before it started"),
        );
        return job.fail(failure);
    };

    let mut comp = outbound_component(&job, &identity).await;
    if comp.has_attachments() && target.check_capability(Capability::CreateMessages) {
        let parts = attachments::mime_parts(&mut comp).await;
        debug!(count = parts.len(), "Attaching files to message");
        job.mime_attachments = Some(parts);
    }

    let mut state = DispatchState::SendingFirst;
    loop {
        state = match state {
            DispatchState::SendingFirst => {
                let method = job.plan.first_method;
                match send(&mut job, method, &comp, &transport, &activity).await {
                    Ok(()) => match job.plan.second_method {
                        Some(second) => DispatchState::SendingSecond(second),
                        None => DispatchState::Done,
                    },
                    Err(e) => DispatchState::Failed(send_failure(target.as_ref(), kind, &e)),
                }
            }
            DispatchState::SendingSecond(method) => {
                match send(&mut job, method, &comp, &transport, &activity).await {
                    Ok(()) => DispatchState::Done,
                    Err(e) => DispatchState::Failed(send_failure(target.as_ref(), kind, &e)),
                }
            }
            DispatchState::Done => return job.succeed(),
            DispatchState::Failed(failure) => {
                warn!(error = %failure, "Sending failed");
                return job.fail(failure);
            }
        };
    }
}

async fn send(
    job: &mut NotifyJob,
    method: Method,
    comp: &CalendarComponent,
    transport: &TransportHandle,
    activity: &Activity,
) -> Result<(), SendError> {
    if activity.is_cancelled() {
        return Err(SendError::Cancelled);
    }

    let flags = job.send_flags();
    let parts = job.mime_attachments.take().unwrap_or_default();
    transport
        .send_component(method, comp, job.persisted.ctx.target.as_ref(), parts, flags)
        .await?;
    info!(%method, "Sent scheduling message");
    Ok(())
}

/// The component the messages describe: the series master when the whole
/// series was edited, trimmed to the delegation chain when delegating.
async fn outbound_component(job: &NotifyJob, identity: &Identity) -> CalendarComponent {
    let ctx = &job.persisted.ctx;
    let edited = &job.send_component;

    let mut comp = if ctx.scope == RecurrenceScope::All && edited.is_instance() {
        match ctx.target.get_object(&edited.uid, None).await {
            Ok(master) => master,
            Err(e) => {
                debug!(error = %e, "Series master unavailable, sending the instance");
                edited.clone()
            }
        }
    } else {
        edited.clone()
    };
    comp.new_attendees = edited.new_attendees.clone();

    if ctx.flags.delegate {
        if let Some(address) = identity.comp_attendee(ctx.target.as_ref(), &comp) {
            comp.retain_delegation_chain(&address);
        }
    }

    comp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Attachment, Attendee, EventTime, Organizer};
    use crate::editor::EditorFlags;
    use crate::itip::MemoryTransport;
    use crate::save::{JobContext, NotificationPlan, PersistedJob};
    use crate::store::{MemoryStore, StoreHandle};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn meeting() -> CalendarComponent {
        let mut comp = CalendarComponent::new(ComponentKind::Event);
        comp.uid = "meet".to_string();
        comp.organizer = Some(Organizer {
            email: "alice@example.com".to_string(),
            name: None,
            sent_by: None,
        });
        let mut carol = Attendee::new("carol@example.com");
        carol.delegated_from = Some("bob@example.com".to_string());
        comp.attendees = vec![
            Attendee::new("alice@example.com"),
            Attendee::new("bob@example.com"),
            carol,
            Attendee::new("dave@example.com"),
        ];
        comp
    }

    fn notify_job(
        target: StoreHandle,
        comp: CalendarComponent,
        plan: NotificationPlan,
        scope: RecurrenceScope,
        flags: EditorFlags,
    ) -> NotifyJob {
        PersistedJob {
            ctx: JobContext {
                source: Some(target.clone()),
                target,
                with_send: true,
                close_after_save: false,
                scope,
                flags,
            },
            component: comp.clone(),
            object_created: false,
            warnings: Vec::new(),
        }
        .into_notify(plan, comp)
    }

    async fn dispatch(job: NotifyJob, transport: Arc<MemoryTransport>, activity: Activity) -> JobOutcome {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(run(job, rx, transport, Identity::default()));
        tx.send(activity).unwrap();
        handle.await.unwrap()
    }

    #[tokio::test]
    async fn delegate_sends_request_then_reply_to_the_chain() {
        let store = Arc::new(MemoryStore::new("work", "Work").with_cal_email("bob@example.com"));
        let transport = Arc::new(MemoryTransport::new());
        let plan = NotificationPlan {
            first_method: Method::Request,
            second_method: Some(Method::Reply),
            strip_alarms: true,
            only_new_attendees: false,
        };
        let flags = EditorFlags {
            delegate: true,
            ..EditorFlags::default()
        };
        let job = notify_job(store, meeting(), plan, RecurrenceScope::This, flags);

        let outcome = dispatch(job, transport.clone(), Activity::new("Sending")).await;

        assert!(outcome.success());
        assert_eq!(transport.methods(), vec![Method::Request, Method::Reply]);
        for message in transport.sent() {
            let emails: Vec<_> = message.component.attendees.iter().map(|a| a.email.as_str()).collect();
            assert_eq!(emails, vec!["bob@example.com", "carol@example.com"]);
            assert!(message.flags.strip_alarms);
        }
        let sent = transport.sent();
        assert_eq!(sent[0].recipients, vec!["carol@example.com"]);
        assert_eq!(sent[1].recipients, vec!["alice@example.com"]);
    }

    #[tokio::test]
    async fn first_failure_stops_dispatch() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let transport = Arc::new(MemoryTransport::new());
        transport.fail_on(Method::Request, SendError::Transport("smtp down".to_string()));
        let plan = NotificationPlan {
            second_method: Some(Method::Reply),
            ..NotificationPlan::default()
        };
        let job = notify_job(store, meeting(), plan, RecurrenceScope::This, EditorFlags::default());

        let outcome = dispatch(job, transport.clone(), Activity::new("Sending")).await;

        let failure = outcome.failure.expect("dispatch should fail");
        assert_eq!(failure.kind, SaveErrorKind::NotificationSendFailed);
        assert_eq!(failure.alert.id, "calendar:failed-send-event");
        assert_eq!(failure.alert.argument.as_deref(), Some("Work"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn dropped_handoff_fails_without_sending() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let transport = Arc::new(MemoryTransport::new());
        let job = notify_job(
            store,
            meeting(),
            NotificationPlan::default(),
            RecurrenceScope::This,
            EditorFlags::default(),
        );

        let (tx, rx) = oneshot::channel::<Activity>();
        drop(tx);
        let outcome = run(job, rx, transport.clone(), Identity::default()).await;

        assert!(!outcome.success());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_sending() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let transport = Arc::new(MemoryTransport::new());
        let job = notify_job(
            store,
            meeting(),
            NotificationPlan::default(),
            RecurrenceScope::This,
            EditorFlags::default(),
        );
        let activity = Activity::new("Sending");
        activity.cancel();

        let outcome = dispatch(job, transport.clone(), activity).await;

        assert!(outcome.failure.expect("cancelled").cancelled);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn attachments_go_with_the_first_message_only() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("agenda.txt");
        std::fs::write(&file, "agenda").unwrap();
        let store = Arc::new(
            MemoryStore::new("work", "Work").with_capability(Capability::CreateMessages),
        );
        let transport = Arc::new(MemoryTransport::new());
        let mut comp = meeting();
        comp.attachments = vec![Attachment::Url(
            url::Url::from_file_path(&file).unwrap().to_string(),
        )];
        let plan = NotificationPlan {
            second_method: Some(Method::Reply),
            ..NotificationPlan::default()
        };
        let job = notify_job(store, comp, plan, RecurrenceScope::This, EditorFlags::default());

        let outcome = dispatch(job, transport.clone(), Activity::new("Sending")).await;

        assert!(outcome.success());
        let sent = transport.sent();
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].data, b"agenda");
        assert!(sent[1].attachments.is_empty());
        assert_eq!(
            sent[0].component.attachments[0],
            Attachment::Url(format!("cid:{}", sent[0].attachments[0].content_id))
        );
    }

    #[tokio::test]
    async fn whole_series_edit_sends_the_master() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let mut master = meeting();
        master.summary = Some("Weekly sync".to_string());
        master.recurrence.rrules = vec!["FREQ=WEEKLY".to_string()];
        store.insert(master);

        let mut instance = meeting();
        instance.summary = Some("Sync (moved)".to_string());
        instance.recurrence_id = Some(EventTime::Date(NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()));
        instance.new_attendees = vec!["dave@example.com".to_string()];
        let transport = Arc::new(MemoryTransport::new());
        let job = notify_job(
            store,
            instance,
            NotificationPlan::default(),
            RecurrenceScope::All,
            EditorFlags::default(),
        );

        let outcome = dispatch(job, transport.clone(), Activity::new("Sending")).await;

        assert!(outcome.success());
        let sent = transport.sent();
        assert_eq!(sent[0].component.summary.as_deref(), Some("Weekly sync"));
        assert_eq!(sent[0].component.new_attendees, vec!["dave@example.com"]);
        assert_eq!(outcome.component.summary.as_deref(), Some("Sync (moved)"));
    }
}
