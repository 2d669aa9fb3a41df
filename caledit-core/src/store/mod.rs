//! The calendar store seam.
//!
//! A [`ComponentStore`] is a handle on one calendar. Object and timezone
//! operations are async and may reach a remote backend; metadata accessors
//! are answered from what was loaded when the calendar was opened.

mod local;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::CalendarComponent;
use crate::timezone::Timezone;

pub use local::LocalStore;
pub use memory::{MemoryStore, StoreCall, StoreOp};

/// Shared store handle, as held by editors and save jobs
pub type StoreHandle = Arc<dyn ComponentStore>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Object not found")]
    NotFound,

    #[error("Calendar is read-only")]
    ReadOnly,

    #[error("Invalid object: {0}")]
    InvalidObject(String),

    #[error("{0}")]
    Backend(String),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound
        } else {
            StoreError::Io(err.to_string())
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which instances of a recurring series an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrenceScope {
    This,
    ThisAndFuture,
    All,
}

/// Optional behaviours a store advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// The backend delivers scheduling messages itself
    SavesSchedules,
    /// Scheduling messages may carry MIME attachments
    CreateMessages,
    /// Components in this calendar never have an organizer
    NoOrganizer,
    /// The organizer address is not the user's email address
    OrganizerNotEmailAddress,
    /// Tasks cannot be assigned to other people
    NoTaskAssignment,
    /// Modifications cannot target an occurrence and the ones after it
    #[serde(rename = "no-thisandfuture")]
    NoThisAndFuture,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SavesSchedules => "saves-schedules",
            Capability::CreateMessages => "create-messages",
            Capability::NoOrganizer => "no-organizer",
            Capability::OrganizerNotEmailAddress => "organizer-not-email-address",
            Capability::NoTaskAssignment => "no-task-assignment",
            Capability::NoThisAndFuture => "no-thisandfuture",
        }
    }
}

#[async_trait]
pub trait ComponentStore: Send + Sync {
    /// Identity of the calendar; two handles with equal source uids refer to
    /// the same calendar.
    fn source_uid(&self) -> &str;

    fn display_name(&self) -> &str;

    fn check_capability(&self, capability: Capability) -> bool;

    fn is_readonly(&self) -> bool;

    /// Directory where attachments of this calendar's components live
    fn local_attachment_store_path(&self) -> PathBuf;

    /// The user's address on this calendar, if the backend has one
    fn cal_email_address(&self) -> Option<String>;

    async fn get_object(&self, uid: &str, rid: Option<&str>) -> StoreResult<CalendarComponent>;

    /// The master and every detached instance sharing `uid`
    async fn get_objects_for_uid(&self, uid: &str) -> StoreResult<Vec<CalendarComponent>>;

    /// Store a new component, returning the uid the backend assigned to it
    async fn create_object(&self, comp: &CalendarComponent) -> StoreResult<String>;

    async fn modify_object(
        &self,
        comp: &CalendarComponent,
        scope: RecurrenceScope,
    ) -> StoreResult<()>;

    async fn remove_object(
        &self,
        uid: &str,
        rid: Option<&str>,
        scope: RecurrenceScope,
    ) -> StoreResult<()>;

    async fn get_timezone(&self, tzid: &str) -> StoreResult<Timezone>;

    async fn add_timezone(&self, zone: &Timezone) -> StoreResult<()>;
}

/// Whether two handles refer to the same calendar.
pub fn same_store(a: &dyn ComponentStore, b: &dyn ComponentStore) -> bool {
    a.source_uid() == b.source_uid()
}

/// Whether `uid`/`rid` exists on `store`. Lookup errors count as absent.
pub async fn object_exists(store: &dyn ComponentStore, uid: &str, rid: Option<&str>) -> bool {
    match store.get_object(uid, rid).await {
        Ok(_) => true,
        Err(StoreError::NotFound) => false,
        Err(e) => {
            tracing::debug!(uid, ?rid, error = %e, "Existence check failed, treating as absent");
            false
        }
    }
}
