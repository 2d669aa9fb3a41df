//! Scheduling messages (iTIP, RFC 5546).
//!
//! A [`NotificationTransport`] delivers one message per call. The attachment
//! list is handed over by value: once sent it belongs to the transport.

mod memory;
mod outbox;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::{CalendarComponent, addresses_equal};
use crate::store::ComponentStore;

pub use memory::{MemoryTransport, SentMessage};
pub use outbox::OutboxTransport;

pub type TransportHandle = Arc<dyn NotificationTransport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Publish,
    Request,
    Reply,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Publish => "PUBLISH",
            Method::Request => "REQUEST",
            Method::Reply => "REPLY",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file sent alongside a scheduling message, referenced from the
/// component as `cid:<content_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeAttachment {
    pub filename: String,
    pub content_type: String,
    pub content_id: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFlags {
    /// Remove reminders before sending
    pub strip_alarms: bool,
    /// Address only attendees added in this editing session
    pub only_new_attendees: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Could not build message: {0}")]
    Message(String),

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Sending was cancelled")]
    Cancelled,
}

impl From<std::io::Error> for SendError {
    fn from(err: std::io::Error) -> Self {
        SendError::Io(err.to_string())
    }
}

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send_component(
        &self,
        method: Method,
        comp: &CalendarComponent,
        store: &dyn ComponentStore,
        attachments: Vec<MimeAttachment>,
        flags: SendFlags,
    ) -> Result<(), SendError>;
}

/// Addresses a message goes to.
///
/// Replies go to the organizer. Requests and publishes go to every attendee
/// except the organizer and `own_address`, or only to the new attendees when
/// `flags.only_new_attendees` is set.
pub fn recipients(
    method: Method,
    comp: &CalendarComponent,
    flags: SendFlags,
    own_address: Option<&str>,
) -> Vec<String> {
    let is_own = |address: &str| own_address.is_some_and(|own| addresses_equal(own, address));

    match method {
        Method::Reply => comp
            .organizer
            .iter()
            .map(|org| org.email.clone())
            .filter(|email| !is_own(email))
            .collect(),
        Method::Request | Method::Publish => comp
            .attendees
            .iter()
            .map(|a| a.email.as_str())
            .filter(|email| {
                !comp
                    .organizer
                    .as_ref()
                    .is_some_and(|org| addresses_equal(&org.email, email))
            })
            .filter(|email| !is_own(email))
            .filter(|email| {
                !flags.only_new_attendees
                    || comp.new_attendees.iter().any(|n| addresses_equal(n, email))
            })
            .map(str::to_string)
            .collect(),
    }
}

/// The component as it goes on the wire: reminders removed when requested,
/// session-only state dropped.
pub fn outgoing_component(comp: &CalendarComponent, flags: SendFlags) -> CalendarComponent {
    let mut outgoing = comp.clone();
    if flags.strip_alarms {
        outgoing.reminders.clear();
    }
    outgoing.new_attendees.clear();
    outgoing
}
