//! User-facing alerts raised by the editor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;

pub const FAILED_ADD_TIMEZONE: &str = "calendar:failed-add-timezone";
pub const FAILED_SAVE_ATTACHMENTS: &str = "calendar:failed-save-attachments";
pub const PROMPT_READ_ONLY: &str = "calendar:prompt-read-only-cal-editor";
pub const PROMPT_NO_TASK_ASSIGNMENT: &str = "calendar:prompt-no-task-assignment-editor";
pub const FAILED_VALIDATE: &str = "calendar:comp-editor-failed-validate";
pub const FAILED_OPEN_CALENDAR: &str = "calendar:failed-open-calendar";

/// An alert: an identifier, an optional argument (usually a calendar name)
/// and an optional detail message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub argument: Option<String>,
    pub detail: Option<String>,
}

impl Alert {
    pub fn new(id: impl Into<String>) -> Self {
        Alert {
            id: id.into(),
            argument: None,
            detail: None,
        }
    }

    /// `calendar:failed-<operation>-<kind>`, e.g. `calendar:failed-modify-task`
    pub fn failed(operation: &str, kind: ComponentKind) -> Self {
        Alert::new(format!("calendar:failed-{}-{}", operation, kind.alert_noun()))
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(ref argument) = self.argument {
            write!(f, " [{}]", argument)?;
        }
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}
