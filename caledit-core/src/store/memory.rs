//! In-process store that records every call.
//!
//! Used by tests and by dry runs; failures can be injected per operation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Capability, ComponentStore, RecurrenceScope, StoreError, StoreResult};
use crate::component::CalendarComponent;
use crate::timezone::Timezone;

type ObjectKey = (String, Option<String>);

/// A recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetObject { uid: String, rid: Option<String> },
    GetObjectsForUid { uid: String },
    CreateObject { uid: String },
    ModifyObject { uid: String, rid: Option<String>, scope: RecurrenceScope },
    RemoveObject { uid: String, rid: Option<String>, scope: RecurrenceScope },
    GetTimezone { tzid: String },
    AddTimezone { tzid: String },
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::GetObject { .. } => StoreOp::GetObject,
            StoreCall::GetObjectsForUid { .. } => StoreOp::GetObjectsForUid,
            StoreCall::CreateObject { .. } => StoreOp::CreateObject,
            StoreCall::ModifyObject { .. } => StoreOp::ModifyObject,
            StoreCall::RemoveObject { .. } => StoreOp::RemoveObject,
            StoreCall::GetTimezone { .. } => StoreOp::GetTimezone,
            StoreCall::AddTimezone { .. } => StoreOp::AddTimezone,
        }
    }

    /// Whether the call changes the store's contents
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.op(),
            StoreOp::CreateObject
                | StoreOp::ModifyObject
                | StoreOp::RemoveObject
                | StoreOp::AddTimezone
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetObject,
    GetObjectsForUid,
    CreateObject,
    ModifyObject,
    RemoveObject,
    GetTimezone,
    AddTimezone,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, CalendarComponent>,
    timezones: HashMap<String, Timezone>,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, StoreError>,
    next_uid: u64,
}

pub struct MemoryStore {
    source_uid: String,
    display_name: String,
    capabilities: HashSet<Capability>,
    readonly: bool,
    cal_email: Option<String>,
    attachment_dir: PathBuf,
    assign_uids: bool,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new(source_uid: &str, display_name: &str) -> Self {
        MemoryStore {
            source_uid: source_uid.to_string(),
            display_name: display_name.to_string(),
            capabilities: HashSet::new(),
            readonly: false,
            cal_email: None,
            attachment_dir: std::env::temp_dir().join("caledit-attachments").join(source_uid),
            assign_uids: false,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_cal_email(mut self, address: &str) -> Self {
        self.cal_email = Some(address.to_string());
        self
    }

    pub fn with_attachment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.attachment_dir = dir.into();
        self
    }

    /// Replace client uids with `server-<n>` on create, like backends that
    /// assign their own identifiers.
    pub fn assigning_uids(mut self) -> Self {
        self.assign_uids = true;
        self
    }

    pub fn with_timezone(self, zone: Timezone) -> Self {
        self.lock().timezones.insert(zone.tzid.clone(), zone);
        self
    }

    /// Seed an object without recording a call
    pub fn insert(&self, comp: CalendarComponent) {
        let key = (comp.uid.clone(), comp.recurrence_id_string());
        self.lock().objects.insert(key, comp);
    }

    /// Make every later call of `op` fail with `error`
    pub fn fail_on(&self, op: StoreOp, error: StoreError) {
        self.lock().failures.insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn object(&self, uid: &str, rid: Option<&str>) -> Option<CalendarComponent> {
        self.lock()
            .objects
            .get(&(uid.to_string(), rid.map(str::to_string)))
            .cloned()
    }

    pub fn objects(&self) -> Vec<CalendarComponent> {
        self.lock().objects.values().cloned().collect()
    }

    pub fn timezone(&self, tzid: &str) -> Option<Timezone> {
        self.lock().timezones.get(tzid).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `call` and return the injected failure for it, if any
    fn record(&self, call: StoreCall) -> StoreResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        let op = call.op();
        state.calls.push(call);
        if let Some(err) = state.failures.get(&op).cloned() {
            return Err(err);
        }
        Ok(state)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.readonly {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ComponentStore for MemoryStore {
    fn source_uid(&self) -> &str {
        &self.source_uid
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn check_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn local_attachment_store_path(&self) -> PathBuf {
        self.attachment_dir.clone()
    }

    fn cal_email_address(&self) -> Option<String> {
        self.cal_email.clone()
    }

    async fn get_object(&self, uid: &str, rid: Option<&str>) -> StoreResult<CalendarComponent> {
        let state = self.record(StoreCall::GetObject {
            uid: uid.to_string(),
            rid: rid.map(str::to_string),
        })?;
        state
            .objects
            .get(&(uid.to_string(), rid.map(str::to_string)))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_objects_for_uid(&self, uid: &str) -> StoreResult<Vec<CalendarComponent>> {
        let state = self.record(StoreCall::GetObjectsForUid {
            uid: uid.to_string(),
        })?;
        let found: Vec<_> = state
            .objects
            .iter()
            .filter(|((u, _), _)| u == uid)
            .map(|(_, comp)| comp.clone())
            .collect();
        if found.is_empty() {
            Err(StoreError::NotFound)
        } else {
            Ok(found)
        }
    }

    async fn create_object(&self, comp: &CalendarComponent) -> StoreResult<String> {
        let mut state = self.record(StoreCall::CreateObject {
            uid: comp.uid.clone(),
        })?;
        self.check_writable()?;

        let mut stored = comp.clone();
        if self.assign_uids {
            state.next_uid += 1;
            stored.uid = format!("server-{}", state.next_uid);
        }
        stored.new_attendees.clear();

        let key = (stored.uid.clone(), stored.recurrence_id_string());
        if state.objects.contains_key(&key) {
            return Err(StoreError::Backend(format!("Object {} already exists", stored.uid)));
        }
        let uid = stored.uid.clone();
        state.objects.insert(key, stored);
        Ok(uid)
    }

    async fn modify_object(
        &self,
        comp: &CalendarComponent,
        scope: RecurrenceScope,
    ) -> StoreResult<()> {
        let mut state = self.record(StoreCall::ModifyObject {
            uid: comp.uid.clone(),
            rid: comp.recurrence_id_string(),
            scope,
        })?;
        self.check_writable()?;

        // An instance may be written on top of its master, which detaches it.
        let key = (comp.uid.clone(), comp.recurrence_id_string());
        let exists = state.objects.contains_key(&key)
            || (key.1.is_some() && state.objects.contains_key(&(comp.uid.clone(), None)));
        if !exists {
            return Err(StoreError::NotFound);
        }

        let mut stored = comp.clone();
        stored.new_attendees.clear();
        state.objects.insert(key, stored);
        Ok(())
    }

    async fn remove_object(
        &self,
        uid: &str,
        rid: Option<&str>,
        scope: RecurrenceScope,
    ) -> StoreResult<()> {
        let mut state = self.record(StoreCall::RemoveObject {
            uid: uid.to_string(),
            rid: rid.map(str::to_string),
            scope,
        })?;
        self.check_writable()?;

        let before = state.objects.len();
        match scope {
            RecurrenceScope::All => state.objects.retain(|(u, _), _| u != uid),
            RecurrenceScope::This | RecurrenceScope::ThisAndFuture => {
                state.objects.remove(&(uid.to_string(), rid.map(str::to_string)));
            }
        }
        if state.objects.len() == before {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn get_timezone(&self, tzid: &str) -> StoreResult<Timezone> {
        let state = self.record(StoreCall::GetTimezone {
            tzid: tzid.to_string(),
        })?;
        state.timezones.get(tzid).cloned().ok_or(StoreError::NotFound)
    }

    async fn add_timezone(&self, zone: &Timezone) -> StoreResult<()> {
        let mut state = self.record(StoreCall::AddTimezone {
            tzid: zone.tzid.clone(),
        })?;
        self.check_writable()?;
        state.timezones.insert(zone.tzid.clone(), zone.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;

    fn event(uid: &str) -> CalendarComponent {
        let mut comp = CalendarComponent::new(ComponentKind::Event);
        comp.uid = uid.to_string();
        comp
    }

    #[tokio::test]
    async fn create_then_get_records_calls() {
        let store = MemoryStore::new("personal", "Personal");

        let uid = store.create_object(&event("a")).await.unwrap();
        let fetched = store.get_object(&uid, None).await.unwrap();

        assert_eq!(fetched.uid, "a");
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::CreateObject { uid: "a".to_string() },
                StoreCall::GetObject { uid: "a".to_string(), rid: None },
            ]
        );
        assert_eq!(store.mutations().len(), 1);
    }

    #[tokio::test]
    async fn assigning_uids_replaces_client_uid() {
        let store = MemoryStore::new("remote", "Remote").assigning_uids();

        let uid = store.create_object(&event("client-uid")).await.unwrap();

        assert_eq!(uid, "server-1");
        assert!(store.object("server-1", None).is_some());
        assert!(store.object("client-uid", None).is_none());
    }

    #[tokio::test]
    async fn injected_failures_are_returned_and_recorded() {
        let store = MemoryStore::new("personal", "Personal");
        store.fail_on(StoreOp::CreateObject, StoreError::Backend("offline".to_string()));

        let err = store.create_object(&event("a")).await.unwrap_err();

        assert_eq!(err, StoreError::Backend("offline".to_string()));
        assert_eq!(store.calls().len(), 1);
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn remove_all_drops_detached_instances() {
        let store = MemoryStore::new("personal", "Personal");
        store.insert(event("series"));
        let mut instance = event("series");
        instance.recurrence_id = Some(crate::component::EventTime::Date(
            chrono::NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        ));
        store.insert(instance);
        store.insert(event("other"));

        store
            .remove_object("series", None, RecurrenceScope::All)
            .await
            .unwrap();

        let uids: Vec<_> = store.objects().into_iter().map(|c| c.uid).collect();
        assert_eq!(uids, vec!["other"]);
    }

    #[tokio::test]
    async fn read_only_store_rejects_writes() {
        let store = MemoryStore::new("holidays", "Holidays").read_only();
        let err = store.create_object(&event("a")).await.unwrap_err();
        assert_eq!(err, StoreError::ReadOnly);
    }
}
