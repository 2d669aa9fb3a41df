//! Global caledit configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CalEditError, CalEditResult};

static DEFAULT_CALENDAR_PATH: &str = "~/calendar";

fn default_calendar_path() -> PathBuf {
    PathBuf::from(DEFAULT_CALENDAR_PATH)
}

fn is_default_calendar_path(p: &PathBuf) -> bool {
    *p == default_calendar_path()
}

/// Global configuration at ~/.config/caledit/config.toml
///
/// Calendar-specific settings (display name, capabilities, address) live in
/// each calendar's .caledit/config.toml instead.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CaleditConfig {
    #[serde(
        default = "default_calendar_path",
        skip_serializing_if = "is_default_calendar_path"
    )]
    pub calendar_dir: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_calendar: Option<String>,

    /// Where outgoing scheduling messages are written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox_dir: Option<PathBuf>,

    /// The user's own addresses, used to recognise them as organizer or attendee
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

impl Default for CaleditConfig {
    fn default() -> Self {
        CaleditConfig {
            calendar_dir: default_calendar_path(),
            default_calendar: None,
            outbox_dir: None,
            addresses: Vec::new(),
        }
    }
}

impl CaleditConfig {
    pub fn config_path() -> CalEditResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalEditError::Config("Could not determine config directory".into()))?
            .join("caledit");

        Ok(config_dir.join("config.toml"))
    }

    /// Save the current config to `path`
    pub fn save(&self, path: &Path) -> CalEditResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CalEditError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| CalEditError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalEditResult<()> {
        let contents = format!(
            "\
# caledit configuration

# Where your calendars live:
# calendar_dir = \"{}\"

# Default calendar for new components:
# default_calendar = \"personal\"

# Where outgoing invitations and replies are written:
# outbox_dir = \"~/.local/share/caledit/outbox\"

# Your own addresses:
# addresses = [\"me@example.com\"]
",
            DEFAULT_CALENDAR_PATH
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalEditError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalEditError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
