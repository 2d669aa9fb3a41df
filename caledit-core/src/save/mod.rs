//! The save-and-notify pipeline.
//!
//! A save attempt is a job value moved through typed phases:
//!
//! ```text
//! SaveJob --persist::run--> PersistedJob --into_notify--> NotifyJob --dispatch::run--> JobOutcome
//!                  \                    \--finish-------------------------------------> JobOutcome
//!                   \--(failure)--------------------------------------------------------> JobOutcome
//! ```
//!
//! Each phase consumes its input, so a job has exactly one owner at a time.

pub mod attachments;
pub mod decision;
pub mod dispatch;
pub mod persist;
pub mod timezones;

use std::fmt;

use crate::alert::Alert;
use crate::component::CalendarComponent;
use crate::editor::EditorFlags;
use crate::itip::{MimeAttachment, SendFlags};
use crate::store::{RecurrenceScope, StoreHandle};

pub use decision::NotificationPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveErrorKind {
    TimezoneResolutionFailed,
    AttachmentCopyFailed,
    CreateFailed,
    ModifyFailed,
    /// The object now lives on both calendars
    RemoveFromSourceFailed,
    /// The submitted component stands in for the refreshed one
    RefetchFailed,
    NotificationSendFailed,
}

impl SaveErrorKind {
    /// Warnings are reported but do not fail the save.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SaveErrorKind::RemoveFromSourceFailed | SaveErrorKind::RefetchFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    pub kind: SaveErrorKind,
    pub alert: Alert,
    /// The failure came from the user cancelling, not from the backend
    pub cancelled: bool,
}

impl SaveFailure {
    pub fn new(kind: SaveErrorKind, alert: Alert) -> Self {
        SaveFailure {
            kind,
            alert,
            cancelled: false,
        }
    }

    pub fn cancelled(kind: SaveErrorKind, alert: Alert) -> Self {
        SaveFailure {
            kind,
            alert: alert.with_detail("Operation was cancelled"),
            cancelled: true,
        }
    }
}

impl fmt::Display for SaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.alert)
    }
}

/// What stays constant across the phases of one save attempt.
#[derive(Clone)]
pub struct JobContext {
    /// Calendar the component was loaded from; `None` for new components
    pub source: Option<StoreHandle>,
    pub target: StoreHandle,
    pub with_send: bool,
    pub close_after_save: bool,
    pub scope: RecurrenceScope,
    pub flags: EditorFlags,
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("source", &self.source.as_ref().map(|s| s.source_uid().to_string()))
            .field("target", &self.target.source_uid())
            .field("with_send", &self.with_send)
            .field("close_after_save", &self.close_after_save)
            .field("scope", &self.scope)
            .field("flags", &self.flags)
            .finish()
    }
}

impl JobContext {
    pub fn source_differs(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| !crate::store::same_store(source.as_ref(), self.target.as_ref()))
    }
}

/// A save attempt waiting to be persisted.
#[derive(Debug)]
pub struct SaveJob {
    pub ctx: JobContext,
    /// Snapshot of the edited component with the form folded in
    pub component: CalendarComponent,
}

impl SaveJob {
    pub fn new(ctx: JobContext, component: CalendarComponent) -> Self {
        SaveJob { ctx, component }
    }
}

/// A job whose component has been written to the target calendar.
#[derive(Debug)]
pub struct PersistedJob {
    pub ctx: JobContext,
    /// The stored component: server uid applied, refreshed unless closing
    pub component: CalendarComponent,
    pub object_created: bool,
    pub warnings: Vec<SaveFailure>,
}

impl PersistedJob {
    /// End the job without notifying anybody.
    pub fn finish(self) -> JobOutcome {
        JobOutcome {
            ctx: self.ctx,
            component: self.component,
            object_created: self.object_created,
            written: true,
            failure: None,
            warnings: self.warnings,
        }
    }

    /// Move on to dispatching `plan`, sending `send_component`.
    pub fn into_notify(self, plan: NotificationPlan, send_component: CalendarComponent) -> NotifyJob {
        NotifyJob {
            persisted: self,
            plan,
            send_component,
            mime_attachments: None,
        }
    }
}

/// A persisted job with scheduling messages to send.
#[derive(Debug)]
pub struct NotifyJob {
    pub persisted: PersistedJob,
    pub plan: NotificationPlan,
    /// The edited component, carrying the session's new attendees
    pub send_component: CalendarComponent,
    /// Taken by the first send
    pub mime_attachments: Option<Vec<MimeAttachment>>,
}

impl NotifyJob {
    pub fn send_flags(&self) -> SendFlags {
        SendFlags {
            strip_alarms: self.plan.strip_alarms,
            only_new_attendees: self.plan.only_new_attendees,
        }
    }

    pub fn succeed(self) -> JobOutcome {
        self.persisted.finish()
    }

    pub fn fail(self, failure: SaveFailure) -> JobOutcome {
        let mut outcome = self.persisted.finish();
        outcome.failure = Some(failure);
        outcome
    }
}

/// Final state of a save attempt.
#[derive(Debug)]
pub struct JobOutcome {
    pub ctx: JobContext,
    /// The persisted component once written, the submitted one otherwise
    pub component: CalendarComponent,
    pub object_created: bool,
    /// The component reached the target calendar, even if sending failed
    pub written: bool,
    pub failure: Option<SaveFailure>,
    pub warnings: Vec<SaveFailure>,
}

impl JobOutcome {
    pub fn failed(ctx: JobContext, component: CalendarComponent, failure: SaveFailure) -> Self {
        JobOutcome {
            ctx,
            component,
            object_created: false,
            written: false,
            failure: Some(failure),
            warnings: Vec::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// The single alert reported for this outcome: the failure, else the
    /// first warning.
    pub fn alert(&self) -> Option<&Alert> {
        self.failure
            .as_ref()
            .or_else(|| self.warnings.first())
            .map(|f| &f.alert)
    }
}
