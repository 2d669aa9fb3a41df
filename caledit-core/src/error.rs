//! Error types for caledit.

use thiserror::Error;

use crate::itip::SendError;
use crate::store::StoreError;

/// Errors that can occur in caledit operations.
#[derive(Error, Debug)]
pub enum CalEditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Send(#[from] SendError),

    #[error("Opening calendar timed out after {0}s")]
    OpenTimeout(u64),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("ICS generation error: {0}")]
    IcsGenerate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Editor is busy saving")]
    Busy,

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Editor is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for caledit operations.
pub type CalEditResult<T> = Result<T, CalEditError>;
