//! Process-wide registry of open editors.
//!
//! One editor per (origin calendar, UID, recurrence-id). Asking for a
//! component that already has an editor returns that editor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::debug;

use super::CompEditor;
use crate::component::CalendarComponent;

pub type SharedEditor = Arc<tokio::sync::Mutex<CompEditor>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditorKey {
    pub origin_source: String,
    pub uid: String,
    pub rid: Option<String>,
}

impl EditorKey {
    pub fn new(origin_source: &str, comp: &CalendarComponent) -> Self {
        EditorKey {
            origin_source: origin_source.to_string(),
            uid: comp.uid.clone(),
            rid: comp.recurrence_id_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct EditorRegistry {
    editors: Arc<Mutex<HashMap<EditorKey, Weak<tokio::sync::Mutex<CompEditor>>>>>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EditorKey, Weak<tokio::sync::Mutex<CompEditor>>>> {
        self.editors.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The open editor for `key`, or a new one built by `open`. The
    /// registry is not locked while `open` runs.
    pub fn find_or_open(&self, key: EditorKey, open: impl FnOnce() -> CompEditor) -> SharedEditor {
        if let Some(existing) = self.find(&key) {
            debug!(uid = %key.uid, "Editor already open");
            return existing;
        }

        let mut editor = open();
        editor.set_registration(self.clone(), key.clone());
        let shared = Arc::new(tokio::sync::Mutex::new(editor));

        let mut editors = self.lock();
        editors.retain(|_, editor| editor.strong_count() > 0);
        // Another caller may have opened the same component meanwhile.
        if let Some(existing) = editors.get(&key).and_then(Weak::upgrade) {
            debug!(uid = %key.uid, "Editor opened concurrently, using that one");
            return existing;
        }
        editors.insert(key, Arc::downgrade(&shared));
        shared
    }

    pub fn find(&self, key: &EditorKey) -> Option<SharedEditor> {
        self.lock().get(key).and_then(Weak::upgrade)
    }

    pub fn unregister(&self, key: &EditorKey) {
        if self.lock().remove(key).is_some() {
            debug!(uid = %key.uid, "Editor unregistered");
        }
    }

    /// Number of live editors
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|editor| editor.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
