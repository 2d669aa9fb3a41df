//! The component editor.
//!
//! A [`CompEditor`] owns the component being edited and the pending form
//! values. Saving runs on spawned tasks; their completions come back over a
//! channel and are applied by whoever owns the editor, through
//! [`CompEditor::process_next`] or [`CompEditor::wait_idle`]. The editor
//! reports what happens as [`EditorEvent`]s.

mod flags;
mod form;
mod kind;
mod prompt;
pub mod registry;
mod target;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::activity::Activity;
use crate::alert::{Alert, FAILED_OPEN_CALENDAR, FAILED_VALIDATE, PROMPT_NO_TASK_ASSIGNMENT, PROMPT_READ_ONLY};
use crate::component::CalendarComponent;
use crate::error::{CalEditError, CalEditResult};
use crate::identity::Identity;
use crate::itip::TransportHandle;
use crate::save::decision::{self, DecisionInput};
use crate::save::{JobContext, JobOutcome, PersistedJob, SaveJob, dispatch, persist};
use crate::store::{Capability, RecurrenceScope, StoreHandle};

pub use flags::EditorFlags;
pub use form::EditorForm;
pub use kind::{EditorKind, EditorPage, Sensitivity};
pub use prompt::{
    Prompter, SaveChangesResponse, ScriptedPrompter, SendPromptRequest, SendPromptResult,
    save_changes_prompt_id,
};
pub use registry::{EditorKey, EditorRegistry, SharedEditor};
pub use target::{OPEN_TIMEOUT, StoreOpener, open_with_timeout};

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A save created a new object on the target calendar
    ObjectCreated,
    EditorClosed { saved: bool },
    BusyChanged(bool),
    ChangedChanged(bool),
    Alert(Alert),
}

#[derive(Debug)]
enum Phase {
    Idle,
    Saving(Activity),
    Notifying(Activity),
    Closed,
}

enum Completion {
    Persisted(Result<PersistedJob, JobOutcome>),
    Dispatched(JobOutcome),
    StoreOpened {
        generation: u64,
        name: String,
        result: CalEditResult<StoreHandle>,
    },
}

/// Collaborators of an editor.
pub struct EditorSetup {
    /// Calendar the component was loaded from; `None` for a new component
    pub source: Option<StoreHandle>,
    /// Calendar to save to
    pub target: StoreHandle,
    pub transport: TransportHandle,
    pub prompter: Arc<dyn Prompter>,
    pub identity: Identity,
    pub flags: EditorFlags,
}

pub struct CompEditor {
    kind: EditorKind,
    flags: EditorFlags,
    component: CalendarComponent,
    form: EditorForm,
    source: Option<StoreHandle>,
    target: StoreHandle,
    transport: TransportHandle,
    prompter: Arc<dyn Prompter>,
    identity: Identity,
    phase: Phase,
    changed: bool,
    sensitivity: Sensitivity,
    open_timeout: Duration,
    open_generation: u64,
    opening: Option<(u64, Activity)>,
    subscribers: Vec<mpsc::UnboundedSender<EditorEvent>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    registration: Option<(EditorRegistry, EditorKey)>,
}

impl CompEditor {
    pub fn new(component: CalendarComponent, setup: EditorSetup) -> Self {
        let kind = EditorKind::from(component.kind);
        let target = setup.target.as_ref();

        let mut flags = setup.flags;
        flags.new_item |= setup.source.is_none();
        flags.meeting |= component.has_attendees();
        flags.user_org |= setup.identity.organizer_is_user(target, &component)
            || setup.identity.sentby_is_user(target, &component);

        let mut form = EditorForm::default();
        kind.fill_widgets(&component, &mut form);
        let sensitivity = kind.sensitize(target, flags, false);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        CompEditor {
            kind,
            flags,
            component,
            form,
            source: setup.source,
            target: setup.target,
            transport: setup.transport,
            prompter: setup.prompter,
            identity: setup.identity,
            phase: Phase::Idle,
            changed: false,
            sensitivity,
            open_timeout: OPEN_TIMEOUT,
            open_generation: 0,
            opening: None,
            subscribers: Vec::new(),
            completions_tx,
            completions_rx,
            registration: None,
        }
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EditorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn kind(&self) -> EditorKind {
        self.kind
    }

    pub fn flags(&self) -> EditorFlags {
        self.flags
    }

    pub fn component(&self) -> &CalendarComponent {
        &self.component
    }

    pub fn form(&self) -> &EditorForm {
        &self.form
    }

    pub fn source(&self) -> Option<&StoreHandle> {
        self.source.as_ref()
    }

    pub fn target(&self) -> &StoreHandle {
        &self.target
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn busy(&self) -> bool {
        matches!(self.phase, Phase::Saving(_) | Phase::Notifying(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }

    pub fn key(&self) -> Option<&EditorKey> {
        self.registration.as_ref().map(|(_, key)| key)
    }

    pub(crate) fn set_registration(&mut self, registry: EditorRegistry, key: EditorKey) {
        self.registration = Some((registry, key));
    }

    fn check_editable(&self) -> CalEditResult<()> {
        match self.phase {
            Phase::Closed => Err(CalEditError::Closed),
            Phase::Saving(_) | Phase::Notifying(_) => Err(CalEditError::Busy),
            Phase::Idle => Ok(()),
        }
    }

    /// Change the form. Marks the editor changed.
    pub fn edit(&mut self, update: impl FnOnce(&mut EditorForm)) -> CalEditResult<()> {
        self.check_editable()?;
        update(&mut self.form);
        self.set_changed(true);
        Ok(())
    }

    fn emit(&mut self, event: EditorEvent) {
        debug!(?event, "Editor event");
        self.subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn set_changed(&mut self, changed: bool) {
        if self.changed != changed {
            self.changed = changed;
            self.emit(EditorEvent::ChangedChanged(changed));
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        let was_busy = self.busy();
        self.phase = phase;
        let busy = self.busy();
        if was_busy != busy {
            self.emit(EditorEvent::BusyChanged(busy));
        }
        self.sensitize();
    }

    fn sensitize(&mut self) {
        self.sensitivity = self
            .kind
            .sensitize(self.target.as_ref(), self.flags, self.busy() || self.is_closed());
    }

    fn user_is_organizer(&self, comp: &CalendarComponent) -> bool {
        let target = self.target.as_ref();
        self.identity.organizer_is_user(target, comp) || self.identity.sentby_is_user(target, comp)
    }

    /// A copy of the live component with the form folded in.
    fn current_component(&self) -> Result<CalendarComponent, String> {
        let mut comp = self.component.clone();
        self.kind.fill_component(&self.form, &mut comp)?;

        if comp.organizer.is_none() || self.user_is_organizer(&comp) {
            comp.sequence += 1;
        }
        comp.updated = Some(Utc::now());
        comp.new_attendees = self.form.added_attendees.clone();
        Ok(comp)
    }

    fn resolve_scope(&self, comp: &CalendarComponent) -> Option<RecurrenceScope> {
        if comp.is_instance() {
            let scope = self.prompter.recurrence_scope(comp, self.target.as_ref())?;
            if scope == RecurrenceScope::ThisAndFuture
                && self.target.check_capability(Capability::NoThisAndFuture)
            {
                debug!("Calendar cannot split a series; saving this occurrence only");
                return Some(RecurrenceScope::This);
            }
            Some(scope)
        } else if comp.has_recurrences() {
            Some(RecurrenceScope::All)
        } else {
            Some(RecurrenceScope::This)
        }
    }

    /// Start saving. Returns the activity of the persistence phase, which
    /// may be cancelled; the outcome arrives through [`Self::process_next`].
    pub fn save(&mut self, with_send: bool, close_after_save: bool) -> CalEditResult<Activity> {
        self.check_editable()?;

        if self.form.summary.trim().is_empty()
            && !self.prompter.prompt_subject(self.kind.component_kind())
        {
            return Err(CalEditError::Cancelled);
        }

        let comp = match self.current_component() {
            Ok(comp) => comp,
            Err(message) => {
                self.emit(EditorEvent::Alert(
                    Alert::new(FAILED_VALIDATE).with_detail(message.clone()),
                ));
                return Err(CalEditError::Validation(message));
            }
        };
        let scope = self.resolve_scope(&comp).ok_or(CalEditError::Cancelled)?;
        let with_send = with_send && (!comp.has_attendees() || self.user_is_organizer(&comp));

        let ctx = JobContext {
            source: self.source.clone(),
            target: self.target.clone(),
            with_send,
            close_after_save,
            scope,
            flags: self.flags,
        };
        info!(uid = %comp.uid, ?scope, with_send, close_after_save, "Saving component");
        let job = SaveJob::new(ctx, comp);

        let activity = Activity::new("Saving changes");
        self.set_phase(Phase::Saving(activity.clone()));

        let worker = activity.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = persist::run(job, worker).await;
            let _ = completions.send(Completion::Persisted(result));
        });

        Ok(activity)
    }

    /// Apply the next background completion. Returns false when nothing is
    /// in flight.
    pub async fn process_next(&mut self) -> bool {
        if !self.busy() && self.opening.is_none() {
            return false;
        }
        let Some(completion) = self.completions_rx.recv().await else {
            return false;
        };

        match completion {
            Completion::Persisted(Ok(persisted)) => self.handle_persisted(persisted),
            Completion::Persisted(Err(outcome)) | Completion::Dispatched(outcome) => {
                self.finish(outcome)
            }
            Completion::StoreOpened {
                generation,
                name,
                result,
            } => self.handle_store_opened(generation, name, result),
        }
        true
    }

    /// Process completions until no save or calendar opening is in flight.
    pub async fn wait_idle(&mut self) {
        while self.process_next().await {}
    }

    fn handle_persisted(&mut self, persisted: PersistedJob) {
        if persisted.object_created {
            self.emit(EditorEvent::ObjectCreated);
        }

        let mut send_component = persisted.component.clone();
        send_component.new_attendees = self.form.added_attendees.clone();

        let target = persisted.ctx.target.as_ref();
        let input = DecisionInput {
            component: &send_component,
            delegate: self.flags.delegate,
            saves_schedules: target.check_capability(Capability::SavesSchedules),
            with_send: persisted.ctx.with_send,
            user_is_organizer: self.identity.organizer_is_user(target, &send_component)
                || self.identity.sentby_is_user(target, &send_component),
            is_new: self.flags.new_item,
        };
        let prompter = self.prompter.clone();
        let plan = decision::decide(input, |request| prompter.send_component(request));

        let Some(plan) = plan else {
            self.finish(persisted.finish());
            return;
        };

        debug!(?plan, "Dispatching scheduling messages");
        let job = persisted.into_notify(plan, send_component);
        let (handoff_tx, handoff_rx) = oneshot::channel();
        let transport = self.transport.clone();
        let identity = self.identity.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = dispatch::run(job, handoff_rx, transport, identity).await;
            let _ = completions.send(Completion::Dispatched(outcome));
        });

        let activity = Activity::new("Sending notifications");
        self.set_phase(Phase::Notifying(activity.clone()));
        if handoff_tx.send(activity).is_err() {
            warn!("Dispatch task ended before receiving its activity");
        }
    }

    fn finish(&mut self, outcome: JobOutcome) {
        self.set_phase(Phase::Idle);
        if let Some(alert) = outcome.alert() {
            self.emit(EditorEvent::Alert(alert.clone()));
        }
        if !outcome.written {
            return;
        }

        let JobOutcome { ctx, component, .. } = outcome;
        if ctx.close_after_save {
            self.shut(true);
            return;
        }

        self.flags.new_item = false;
        self.component = component;
        self.kind.fill_widgets(&self.component, &mut self.form);
        self.source = Some(ctx.target);
        self.sensitize();
        self.set_changed(false);
    }

    fn shut(&mut self, saved: bool) {
        self.phase = Phase::Closed;
        self.sensitize();
        self.emit(EditorEvent::EditorClosed { saved });
        if let Some((registry, key)) = self.registration.take() {
            registry.unregister(&key);
        }
    }

    /// Cancel whatever is in flight. Cancellation is cooperative: a store
    /// or transport call that already started is not interrupted.
    pub fn cancel(&self) {
        if let Phase::Saving(activity) | Phase::Notifying(activity) = &self.phase {
            info!(activity = activity.description(), "Cancelling");
            activity.cancel();
        }
        if let Some((_, activity)) = &self.opening {
            activity.cancel();
        }
    }

    /// Close without saving.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.cancel();
        self.opening = None;
        self.shut(false);
    }

    /// Offer to save pending changes before the editor goes away. Returns
    /// whether the editor may close.
    pub async fn prompt_and_save_changes(&mut self, with_send: bool) -> CalEditResult<bool> {
        if !self.changed {
            return Ok(true);
        }

        let kind = self.kind.component_kind();
        match self.prompter.save_changes(kind, self.flags.meeting) {
            SaveChangesResponse::Discard => return Ok(true),
            SaveChangesResponse::Cancel => return Ok(false),
            SaveChangesResponse::Save => {}
        }

        let calendar = self.target.display_name().to_string();
        if self.target.is_readonly() {
            self.emit(EditorEvent::Alert(
                Alert::new(PROMPT_READ_ONLY).with_argument(calendar),
            ));
            return Ok(false);
        }
        if self.flags.is_assigned
            && self.kind == EditorKind::Task
            && self.target.check_capability(Capability::NoTaskAssignment)
        {
            self.emit(EditorEvent::Alert(
                Alert::new(PROMPT_NO_TASK_ASSIGNMENT).with_argument(calendar),
            ));
            return Ok(false);
        }

        match self.save(with_send, true) {
            Ok(_) => {}
            Err(CalEditError::Cancelled | CalEditError::Validation(_)) => return Ok(false),
            Err(e) => return Err(e),
        }
        self.wait_idle().await;
        Ok(self.is_closed())
    }

    /// Switch the calendar to save to. Opening runs in the background with
    /// a timeout; a previous opening still in flight is cancelled.
    pub fn set_target_store(&mut self, opener: Arc<dyn StoreOpener>, name: &str) -> CalEditResult<()> {
        self.check_editable()?;

        if let Some((_, previous)) = self.opening.take() {
            debug!("Cancelling previous calendar opening");
            previous.cancel();
        }
        self.open_generation += 1;
        let generation = self.open_generation;
        let activity = Activity::new(format!("Opening {}", name));
        self.opening = Some((generation, activity.clone()));

        let name = name.to_string();
        let timeout = self.open_timeout;
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = activity.cancelled() => Err(CalEditError::Cancelled),
                result = open_with_timeout(opener.as_ref(), &name, timeout) => result,
            };
            let _ = completions.send(Completion::StoreOpened {
                generation,
                name,
                result,
            });
        });
        Ok(())
    }

    fn handle_store_opened(
        &mut self,
        generation: u64,
        name: String,
        result: CalEditResult<StoreHandle>,
    ) {
        if !matches!(self.opening, Some((current, _)) if current == generation) {
            debug!(%name, "Ignoring superseded calendar opening");
            return;
        }
        self.opening = None;

        match result {
            Ok(store) => {
                info!(calendar = %store.source_uid(), "Target calendar changed");
                self.target = store;
                self.sensitize();
                self.set_changed(true);
            }
            Err(CalEditError::Cancelled) => debug!(%name, "Calendar opening cancelled"),
            Err(e) => {
                warn!(%name, error = %e, "Could not open calendar");
                self.emit(EditorEvent::Alert(
                    Alert::new(FAILED_OPEN_CALENDAR)
                        .with_argument(name)
                        .with_detail(e.to_string()),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Attendee, ComponentKind, EventTime, Organizer};
    use crate::itip::MemoryTransport;
    use crate::store::{MemoryStore, StoreCall, StoreError, StoreOp};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn event() -> CalendarComponent {
        let mut comp = CalendarComponent::new(ComponentKind::Event);
        comp.summary = Some("Planning".to_string());
        comp.start = Some(EventTime::Date(NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()));
        comp
    }

    fn editor(
        comp: CalendarComponent,
        source: Option<Arc<MemoryStore>>,
        target: Arc<MemoryStore>,
        prompter: ScriptedPrompter,
    ) -> CompEditor {
        CompEditor::new(
            comp,
            EditorSetup {
                source: source.map(|s| s as StoreHandle),
                target,
                transport: Arc::new(MemoryTransport::new()),
                prompter: Arc::new(prompter),
                identity: Identity::new(vec!["me@example.com".to_string()]),
                flags: EditorFlags::default(),
            },
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EditorEvent>) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn save_and_stay_open_refreshes_editor() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let mut editor = editor(event(), None, store.clone(), ScriptedPrompter::default());
        let mut events = editor.subscribe();

        editor.edit(|form| form.summary = "Planning v2".to_string()).unwrap();
        editor.save(false, false).unwrap();
        assert!(editor.busy());
        assert!(editor.save(false, false).is_err());
        editor.wait_idle().await;

        assert!(!editor.busy());
        assert!(!editor.changed());
        assert!(!editor.flags().new_item);
        assert_eq!(editor.source().map(|s| s.source_uid()), Some("work"));
        assert_eq!(editor.component().summary.as_deref(), Some("Planning v2"));
        assert_eq!(
            drain(&mut events),
            vec![
                EditorEvent::ChangedChanged(true),
                EditorEvent::BusyChanged(true),
                EditorEvent::ObjectCreated,
                EditorEvent::BusyChanged(false),
                EditorEvent::ChangedChanged(false),
            ]
        );

        editor.edit(|form| form.location = "Room 4".to_string()).unwrap();
        editor.save(false, false).unwrap();
        editor.wait_idle().await;
        assert_eq!(store.objects().len(), 1);
        assert_eq!(store.objects()[0].location.as_deref(), Some("Room 4"));
    }

    #[tokio::test]
    async fn failed_save_keeps_edits_and_alerts_once() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        store.fail_on(StoreOp::CreateObject, StoreError::Backend("offline".to_string()));
        let mut editor = editor(event(), None, store, ScriptedPrompter::default());
        let mut events = editor.subscribe();

        editor.edit(|form| form.summary = "Unsaved".to_string()).unwrap();
        editor.save(true, true).unwrap();
        editor.wait_idle().await;

        assert!(!editor.is_closed());
        assert!(editor.changed());
        assert_eq!(editor.form().summary, "Unsaved");
        let alerts: Vec<_> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                EditorEvent::Alert(alert) => Some(alert),
                _ => None,
            })
            .collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "calendar:failed-create-event");
        assert_eq!(alerts[0].argument.as_deref(), Some("Work"));
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_before_saving() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let mut editor = editor(event(), None, store.clone(), ScriptedPrompter::default());
        let mut events = editor.subscribe();

        editor.edit(|form| form.start = None).unwrap();
        let err = editor.save(false, true).unwrap_err();

        assert!(matches!(err, CalEditError::Validation(_)));
        assert!(!editor.busy());
        assert!(store.calls().is_empty());
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            EditorEvent::Alert(alert) if alert.id == FAILED_VALIDATE
        )));
    }

    #[tokio::test]
    async fn declining_empty_summary_aborts() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let prompter = ScriptedPrompter {
            save_without_subject: false,
            ..ScriptedPrompter::default()
        };
        let mut comp = event();
        comp.summary = None;
        let mut editor = editor(comp, None, store.clone(), prompter);

        assert!(matches!(editor.save(false, true), Err(CalEditError::Cancelled)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn sequence_bumps_only_for_organizer_or_unorganized() {
        let store = Arc::new(MemoryStore::new("work", "Work"));

        let mut theirs = event();
        theirs.organizer = Some(Organizer {
            email: "boss@example.com".to_string(),
            name: None,
            sent_by: None,
        });
        theirs.attendees = vec![Attendee::new("me@example.com")];
        store.insert(theirs.clone());
        let mut editor = editor(theirs.clone(), Some(store.clone()), store.clone(), ScriptedPrompter::default());
        editor.save(false, true).unwrap();
        editor.wait_idle().await;
        assert_eq!(store.object(&theirs.uid, None).unwrap().sequence, 0);

        let mine = event();
        let mut editor = editor_for(mine.clone(), store.clone());
        editor.save(false, true).unwrap();
        editor.wait_idle().await;
        assert_eq!(store.object(&mine.uid, None).unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn this_and_future_falls_back_to_this_when_unsupported() {
        let store = Arc::new(
            MemoryStore::new("work", "Work").with_capability(Capability::NoThisAndFuture),
        );
        let mut master = event();
        master.recurrence.rrules = vec!["FREQ=DAILY".to_string()];
        store.insert(master.clone());
        let mut instance = master.clone();
        instance.recurrence_id = Some(EventTime::Date(NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()));
        let prompter = ScriptedPrompter {
            scope: Some(RecurrenceScope::ThisAndFuture),
            ..ScriptedPrompter::default()
        };
        let mut editor = editor(instance, Some(store.clone()), store.clone(), prompter);

        editor.save(false, true).unwrap();
        editor.wait_idle().await;

        assert!(matches!(
            store.mutations().as_slice(),
            [StoreCall::ModifyObject { scope: RecurrenceScope::This, .. }]
        ));
        let detached = store.object(&master.uid, Some("20250507")).unwrap();
        assert!(!detached.has_recurrences());
    }

    fn editor_for(comp: CalendarComponent, store: Arc<MemoryStore>) -> CompEditor {
        editor(comp, None, store, ScriptedPrompter::default())
    }

    #[tokio::test]
    async fn prompt_and_save_changes_guards_read_only_calendars() {
        let store = Arc::new(MemoryStore::new("holidays", "Holidays").read_only());
        let mut editor = editor_for(event(), store);
        assert!(editor.prompt_and_save_changes(true).await.unwrap());

        let mut events = editor.subscribe();
        editor.edit(|form| form.summary = "Changed".to_string()).unwrap();
        assert!(!editor.prompt_and_save_changes(true).await.unwrap());
        assert!(drain(&mut events).contains(&EditorEvent::Alert(
            Alert::new(PROMPT_READ_ONLY).with_argument("Holidays")
        )));
    }

    #[tokio::test]
    async fn prompt_and_save_changes_saves_and_closes() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let mut editor = editor_for(event(), store.clone());
        let mut events = editor.subscribe();
        editor.edit(|form| form.summary = "Kickoff".to_string()).unwrap();

        assert!(editor.prompt_and_save_changes(false).await.unwrap());

        assert!(editor.is_closed());
        assert_eq!(store.objects().len(), 1);
        assert!(drain(&mut events).contains(&EditorEvent::EditorClosed { saved: true }));
    }

    #[tokio::test]
    async fn discarding_changes_allows_close() {
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let prompter = ScriptedPrompter {
            save_changes: SaveChangesResponse::Discard,
            ..ScriptedPrompter::default()
        };
        let mut editor = editor(event(), None, store.clone(), prompter);
        editor.edit(|form| form.summary = "Draft".to_string()).unwrap();

        assert!(editor.prompt_and_save_changes(true).await.unwrap());
        assert!(store.calls().is_empty());
    }

    struct Calendars;

    #[async_trait]
    impl StoreOpener for Calendars {
        async fn open(&self, name: &str) -> CalEditResult<StoreHandle> {
            match name {
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(120)).await;
                    Ok(Arc::new(MemoryStore::new("slow", "Slow")))
                }
                "missing" => Err(CalEditError::CalendarNotFound(name.to_string())),
                _ => Ok(Arc::new(MemoryStore::new(name, name))),
            }
        }
    }

    #[tokio::test]
    async fn set_target_store_switches_calendar() {
        let mut editor = editor_for(event(), Arc::new(MemoryStore::new("work", "Work")));
        let mut events = editor.subscribe();

        editor.set_target_store(Arc::new(Calendars), "home").unwrap();
        editor.wait_idle().await;

        assert_eq!(editor.target().source_uid(), "home");
        assert!(editor.changed());
        assert_eq!(drain(&mut events), vec![EditorEvent::ChangedChanged(true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calendar_open_times_out_with_alert() {
        let mut editor = editor_for(event(), Arc::new(MemoryStore::new("work", "Work")));
        let mut events = editor.subscribe();

        editor.set_target_store(Arc::new(Calendars), "slow").unwrap();
        editor.wait_idle().await;

        assert_eq!(editor.target().source_uid(), "work");
        let events = drain(&mut events);
        assert!(matches!(
            events.as_slice(),
            [EditorEvent::Alert(alert)] if alert.id == FAILED_OPEN_CALENDAR
                && alert.argument.as_deref() == Some("slow")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_calendar_open_supersedes_older() {
        let mut editor = editor_for(event(), Arc::new(MemoryStore::new("work", "Work")));

        editor.set_target_store(Arc::new(Calendars), "slow").unwrap();
        editor.set_target_store(Arc::new(Calendars), "home").unwrap();
        editor.wait_idle().await;

        assert_eq!(editor.target().source_uid(), "home");
    }

    #[tokio::test]
    async fn close_unregisters_editor() {
        let registry = EditorRegistry::new();
        let comp = event();
        let key = EditorKey::new("work", &comp);
        let shared = registry.find_or_open(key.clone(), || {
            editor_for(comp.clone(), Arc::new(MemoryStore::new("work", "Work")))
        });
        let again = registry.find_or_open(key.clone(), || panic!("editor should be reused"));
        assert!(Arc::ptr_eq(&shared, &again));

        let mut guard = shared.lock().await;
        let mut events = guard.subscribe();
        guard.close();

        assert!(guard.is_closed());
        assert_eq!(drain(&mut events), vec![EditorEvent::EditorClosed { saved: false }]);
        assert!(registry.find(&key).is_none());
    }

    #[tokio::test]
    async fn dropped_editors_leave_the_registry() {
        let registry = EditorRegistry::new();
        let comp = event();
        let key = EditorKey::new("work", &comp);

        let shared = registry.find_or_open(key.clone(), || {
            editor_for(comp.clone(), Arc::new(MemoryStore::new("work", "Work")))
        });
        assert_eq!(registry.len(), 1);
        drop(shared);

        assert!(registry.is_empty());
        let mut reopened = false;
        registry.find_or_open(key, || {
            reopened = true;
            editor_for(comp.clone(), Arc::new(MemoryStore::new("work", "Work")))
        });
        assert!(reopened);
    }

    #[tokio::test]
    async fn editor_constructor_may_consult_the_registry() {
        let registry = EditorRegistry::new();
        let store = Arc::new(MemoryStore::new("work", "Work"));
        let first = event();
        let second = event();

        let _held = registry.find_or_open(EditorKey::new("work", &first), || {
            editor_for(first.clone(), store.clone())
        });
        let shared = registry.find_or_open(EditorKey::new("work", &second), || {
            assert_eq!(registry.len(), 1);
            assert!(registry.find(&EditorKey::new("work", &second)).is_none());
            editor_for(second.clone(), store.clone())
        });

        assert_eq!(registry.len(), 2);
        assert_eq!(
            shared.lock().await.key(),
            Some(&EditorKey::new("work", &second))
        );
    }
}
