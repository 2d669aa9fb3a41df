//! Per-calendar configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CalEditError, CalEditResult};
use crate::store::Capability;

/// Configuration stored in each calendar's .caledit/config.toml
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct CalendarConfig {
    /// Name shown in prompts and alerts; defaults to the directory name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,

    /// The user's address on this calendar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,
}

impl CalendarConfig {
    /// Load config from .caledit/config.toml
    pub fn load(calendar_dir: &Path) -> CalEditResult<Self> {
        let path = calendar_dir.join(".caledit/config.toml");

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: CalendarConfig =
                toml::from_str(&content).map_err(|e| CalEditError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to .caledit/config.toml
    pub fn save(&self, calendar_dir: &Path) -> CalEditResult<()> {
        let dir = calendar_dir.join(".caledit");
        std::fs::create_dir_all(&dir)?;

        let content =
            toml::to_string_pretty(self).map_err(|e| CalEditError::Config(e.to_string()))?;
        std::fs::write(dir.join("config.toml"), content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(CalendarConfig::load(dir.path()).unwrap(), CalendarConfig::default());
    }

    #[test]
    fn save_and_load_keeps_capabilities() {
        let dir = TempDir::new().unwrap();
        let config = CalendarConfig {
            display_name: Some("Team".to_string()),
            read_only: false,
            email: Some("team@example.com".to_string()),
            capabilities: vec![Capability::SavesSchedules, Capability::CreateMessages],
        };

        config.save(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join(".caledit/config.toml")).unwrap();
        assert!(content.contains("saves-schedules"), "{}", content);

        assert_eq!(CalendarConfig::load(dir.path()).unwrap(), config);
    }
}
