//! Directory-backed calendar store.
//!
//! Layout of a calendar directory:
//!
//! ```text
//! work/
//!   <uid>.ics                    master or single component
//!   <uid>--<recurrence-id>.ics   detached instance
//!   .caledit/config.toml         display name, read-only flag, capabilities
//!   .caledit/timezones.json      timezones added by the editor
//!   .caledit/attachments/        materialized attachments
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{Capability, ComponentStore, RecurrenceScope, StoreError, StoreResult};
use crate::component::{CalendarComponent, safe_filename};
use crate::config::CalendarConfig;
use crate::error::CalEditResult;
use crate::ics::{generate_ics, parse_component};
use crate::timezone::Timezone;

const RID_SEPARATOR: &str = "--";

pub struct LocalStore {
    dir: PathBuf,
    name: String,
    config: CalendarConfig,
}

impl LocalStore {
    /// Open the calendar stored in `dir`, reading its .caledit/config.toml
    pub fn open(dir: &Path) -> CalEditResult<Self> {
        let config = CalendarConfig::load(dir)?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.to_string_lossy().into_owned());

        Ok(LocalStore {
            dir: dir.to_path_buf(),
            name,
            config,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    fn object_path(&self, uid: &str, rid: Option<&str>) -> PathBuf {
        let stem = safe_filename(uid);
        let filename = match rid {
            Some(rid) => format!("{}{}{}.ics", stem, RID_SEPARATOR, safe_filename(rid)),
            None => format!("{}.ics", stem),
        };
        self.dir.join(filename)
    }

    fn timezones_path(&self) -> PathBuf {
        self.dir.join(".caledit").join("timezones.json")
    }

    async fn read_object(&self, path: &Path) -> StoreResult<CalendarComponent> {
        let content = tokio::fs::read_to_string(path).await?;
        parse_component(&content)
            .ok_or_else(|| StoreError::InvalidObject(path.display().to_string()))
    }

    async fn write_object(&self, comp: &CalendarComponent) -> StoreResult<()> {
        let content =
            generate_ics(comp).map_err(|e| StoreError::InvalidObject(e.to_string()))?;
        let rid = comp.recurrence_id_string();
        let path = self.object_path(&comp.uid, rid.as_deref());
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), "Wrote component");
        Ok(())
    }

    /// Files belonging to `uid`: the master file and every instance file
    async fn files_for_uid(&self, uid: &str) -> StoreResult<Vec<PathBuf>> {
        let stem = safe_filename(uid);
        let master = format!("{}.ics", stem);
        let instance_prefix = format!("{}{}", stem, RID_SEPARATOR);

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == master || (name.starts_with(&instance_prefix) && name.ends_with(".ics")) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn load_timezones(&self) -> StoreResult<BTreeMap<String, Timezone>> {
        match tokio::fs::read_to_string(self.timezones_path()).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Backend(format!("Corrupt timezone cache: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.config.read_only {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ComponentStore for LocalStore {
    fn source_uid(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        self.config.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Instance files have no notion of a split series, so "this and
    /// future" edits are never supported here.
    fn check_capability(&self, capability: Capability) -> bool {
        capability == Capability::NoThisAndFuture || self.config.capabilities.contains(&capability)
    }

    fn is_readonly(&self) -> bool {
        self.config.read_only
    }

    fn local_attachment_store_path(&self) -> PathBuf {
        self.dir.join(".caledit").join("attachments")
    }

    fn cal_email_address(&self) -> Option<String> {
        self.config.email.clone()
    }

    async fn get_object(&self, uid: &str, rid: Option<&str>) -> StoreResult<CalendarComponent> {
        let comp = self.read_object(&self.object_path(uid, rid)).await?;
        if comp.uid != uid {
            return Err(StoreError::NotFound);
        }
        Ok(comp)
    }

    async fn get_objects_for_uid(&self, uid: &str) -> StoreResult<Vec<CalendarComponent>> {
        let mut found = Vec::new();
        for path in self.files_for_uid(uid).await? {
            let comp = self.read_object(&path).await?;
            if comp.uid == uid {
                found.push(comp);
            }
        }
        if found.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(found)
    }

    async fn create_object(&self, comp: &CalendarComponent) -> StoreResult<String> {
        self.check_writable()?;
        let rid = comp.recurrence_id_string();
        let path = self.object_path(&comp.uid, rid.as_deref());
        if tokio::fs::try_exists(&path).await? {
            return Err(StoreError::Backend(format!(
                "Object {} already exists",
                comp.uid
            )));
        }
        self.write_object(comp).await?;
        Ok(comp.uid.clone())
    }

    async fn modify_object(
        &self,
        comp: &CalendarComponent,
        _scope: RecurrenceScope,
    ) -> StoreResult<()> {
        self.check_writable()?;
        let rid = comp.recurrence_id_string();
        let exists = tokio::fs::try_exists(self.object_path(&comp.uid, rid.as_deref())).await?
            || (rid.is_some() && tokio::fs::try_exists(self.object_path(&comp.uid, None)).await?);
        if !exists {
            return Err(StoreError::NotFound);
        }
        self.write_object(comp).await
    }

    async fn remove_object(
        &self,
        uid: &str,
        rid: Option<&str>,
        scope: RecurrenceScope,
    ) -> StoreResult<()> {
        self.check_writable()?;
        match scope {
            RecurrenceScope::All => {
                let files = self.files_for_uid(uid).await?;
                if files.is_empty() {
                    return Err(StoreError::NotFound);
                }
                for path in files {
                    tokio::fs::remove_file(&path).await?;
                }
            }
            RecurrenceScope::This | RecurrenceScope::ThisAndFuture => {
                tokio::fs::remove_file(self.object_path(uid, rid)).await?;
            }
        }
        Ok(())
    }

    async fn get_timezone(&self, tzid: &str) -> StoreResult<Timezone> {
        self.load_timezones()
            .await?
            .remove(tzid)
            .ok_or(StoreError::NotFound)
    }

    async fn add_timezone(&self, zone: &Timezone) -> StoreResult<()> {
        self.check_writable()?;
        let mut zones = self.load_timezones().await?;
        zones.insert(zone.tzid.clone(), zone.clone());

        let content = serde_json::to_string_pretty(&zones)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::create_dir_all(self.dir.join(".caledit")).await?;
        tokio::fs::write(self.timezones_path(), content).await?;
        Ok(())
    }
}
