//! Transport that records messages instead of delivering them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Method, MimeAttachment, NotificationTransport, SendError, SendFlags, recipients};
use crate::component::CalendarComponent;
use crate::store::ComponentStore;

/// One recorded send
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub method: Method,
    pub component: CalendarComponent,
    pub recipients: Vec<String>,
    pub attachments: Vec<MimeAttachment>,
    pub flags: SendFlags,
    pub store: String,
}

#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<SentMessage>>,
    failures: Mutex<HashMap<Method, SendError>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send of `method` fail with `error`
    pub fn fail_on(&self, method: Method, error: SendError) {
        lock(&self.failures).insert(method, error);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    pub fn methods(&self) -> Vec<Method> {
        lock(&self.sent).iter().map(|m| m.method).collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    async fn send_component(
        &self,
        method: Method,
        comp: &CalendarComponent,
        store: &dyn ComponentStore,
        attachments: Vec<MimeAttachment>,
        flags: SendFlags,
    ) -> Result<(), SendError> {
        if let Some(err) = lock(&self.failures).get(&method).cloned() {
            return Err(err);
        }

        let own = store.cal_email_address();
        lock(&self.sent).push(SentMessage {
            method,
            component: comp.clone(),
            recipients: recipients(method, comp, flags, own.as_deref()),
            attachments,
            flags,
            store: store.source_uid().to_string(),
        });
        Ok(())
    }
}
