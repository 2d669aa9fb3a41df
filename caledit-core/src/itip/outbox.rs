//! Transport that writes messages into an outbox directory.
//!
//! Each message becomes a directory holding `message.ics`, an
//! `envelope.json` with addressing metadata, and one file per MIME part.
//! A mail agent (or a person) picks them up from there.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::{
    Method, MimeAttachment, NotificationTransport, SendError, SendFlags, outgoing_component,
    recipients,
};
use crate::component::{CalendarComponent, safe_filename};
use crate::ics::generate_itip;
use crate::store::ComponentStore;

#[derive(Serialize)]
struct Envelope<'a> {
    method: Method,
    from: Option<String>,
    to: Vec<String>,
    subject: Option<&'a str>,
    calendar: &'a str,
    uid: &'a str,
    created: DateTime<Utc>,
    attachments: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    /// Name of the part's file in the message directory
    file: String,
    #[serde(flatten)]
    attachment: &'a MimeAttachment,
}

/// File name for a MIME part; the content id keeps same-named parts apart.
fn part_filename(attachment: &MimeAttachment) -> String {
    safe_filename(&format!("{}-{}", attachment.content_id, attachment.filename))
}

pub struct OutboxTransport {
    dir: PathBuf,
    from: Option<String>,
}

impl OutboxTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        OutboxTransport {
            dir: dir.into(),
            from: None,
        }
    }

    /// Sender address used when the calendar has none of its own
    pub fn with_from(mut self, address: Option<String>) -> Self {
        self.from = address;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn message_dir(&self, method: Method, comp: &CalendarComponent) -> PathBuf {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.dir.join(format!(
            "{}-{}-{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            method.as_str().to_lowercase(),
            safe_filename(&comp.uid),
            &id[..8]
        ))
    }
}

#[async_trait]
impl NotificationTransport for OutboxTransport {
    async fn send_component(
        &self,
        method: Method,
        comp: &CalendarComponent,
        store: &dyn ComponentStore,
        attachments: Vec<MimeAttachment>,
        flags: SendFlags,
    ) -> Result<(), SendError> {
        let from = store.cal_email_address().or_else(|| self.from.clone());
        let to = recipients(method, comp, flags, from.as_deref());
        if to.is_empty() {
            debug!(uid = %comp.uid, %method, "No recipients, nothing to send");
            return Ok(());
        }

        let outgoing = outgoing_component(comp, flags);
        let ics = generate_itip(method.as_str(), &outgoing)
            .map_err(|e| SendError::Message(e.to_string()))?;

        let dir = self.message_dir(method, comp);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("message.ics"), ics).await?;

        let mut parts = Vec::with_capacity(attachments.len());
        for attachment in &attachments {
            let file = part_filename(attachment);
            tokio::fs::write(dir.join(&file), &attachment.data).await?;
            parts.push(Part { file, attachment });
        }

        let envelope = Envelope {
            method,
            from,
            to,
            subject: outgoing.summary.as_deref(),
            calendar: store.display_name(),
            uid: &outgoing.uid,
            created: Utc::now(),
            attachments: parts,
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| SendError::Message(e.to_string()))?;
        tokio::fs::write(dir.join("envelope.json"), json).await?;

        info!(path = %dir.display(), %method, recipients = envelope.to.len(), "Queued scheduling message");
        Ok(())
    }
}
