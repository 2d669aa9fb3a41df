//! Root of the user's caledit setup: global config plus the calendar directory.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};

use crate::config::CaleditConfig;
use crate::error::{CalEditError, CalEditResult};
use crate::identity::Identity;
use crate::store::LocalStore;

#[derive(Clone, Debug)]
pub struct Caledit {
    config: CaleditConfig,
}

impl Caledit {
    /// Load ~/.config/caledit/config.toml, creating it on first run.
    /// `CALEDIT_*` environment variables override file values.
    pub fn load() -> CalEditResult<Self> {
        let config_path = CaleditConfig::config_path()?;

        if !config_path.exists() {
            CaleditConfig::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> CalEditResult<Self> {
        let config: CaleditConfig = Config::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("CALEDIT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("addresses"),
            )
            .build()
            .map_err(|e| CalEditError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalEditError::Config(e.to_string()))?;

        Ok(Caledit { config })
    }

    pub fn from_config(config: CaleditConfig) -> Self {
        Caledit { config }
    }

    pub fn config(&self) -> &CaleditConfig {
        &self.config
    }

    pub fn data_path(&self) -> PathBuf {
        expand(&self.config.calendar_dir)
    }

    pub fn outbox_path(&self) -> PathBuf {
        match self.config.outbox_dir {
            Some(ref dir) => expand(dir),
            None => dirs::data_dir()
                .unwrap_or_else(|| self.data_path())
                .join("caledit")
                .join("outbox"),
        }
    }

    /// Calendar names: subdirectories of calendar_dir that hold a `.caledit` dir.
    pub fn calendars(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.data_path()) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && path.join(".caledit").exists())
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();

        names.sort();
        names
    }

    pub fn default_calendar(&self) -> Option<String> {
        let name = self.config.default_calendar.as_ref()?;
        self.calendars().into_iter().find(|c| c == name)
    }

    pub fn calendar_path(&self, name: &str) -> PathBuf {
        self.data_path().join(name)
    }

    pub fn open_calendar(&self, name: &str) -> CalEditResult<LocalStore> {
        let path = self.calendar_path(name);
        if !path.join(".caledit").exists() {
            return Err(CalEditError::CalendarNotFound(name.to_string()));
        }
        LocalStore::open(&path)
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.config.addresses.clone())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_from_reads_file_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "calendar_dir = \"{}\"\ndefault_calendar = \"work\"\naddresses = [\"me@example.com\"]\n",
                dir.path().display()
            ),
        )
        .unwrap();

        let caledit = Caledit::load_from(&path).unwrap();

        assert_eq!(caledit.data_path(), dir.path());
        assert_eq!(caledit.config().addresses, vec!["me@example.com"]);
    }

    #[test]
    fn calendars_lists_only_marked_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("work/.caledit")).unwrap();
        std::fs::create_dir_all(dir.path().join("home/.caledit")).unwrap();
        std::fs::create_dir_all(dir.path().join("scratch")).unwrap();

        let caledit = Caledit::from_config(CaleditConfig {
            calendar_dir: dir.path().to_path_buf(),
            default_calendar: Some("work".to_string()),
            ..CaleditConfig::default()
        });

        assert_eq!(caledit.calendars(), vec!["home", "work"]);
        assert_eq!(caledit.default_calendar().as_deref(), Some("work"));
        assert!(matches!(
            caledit.open_calendar("scratch"),
            Err(CalEditError::CalendarNotFound(_))
        ));
    }
}
