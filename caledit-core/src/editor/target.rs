//! Opening the calendar an editor saves to.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CalEditError, CalEditResult};
use crate::store::StoreHandle;

/// How long opening a calendar may take before it is given up.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self, name: &str) -> CalEditResult<StoreHandle>;
}

/// Open `name` through `opener`, failing with [`CalEditError::OpenTimeout`]
/// after `timeout`.
pub async fn open_with_timeout(
    opener: &dyn StoreOpener,
    name: &str,
    timeout: Duration,
) -> CalEditResult<StoreHandle> {
    match tokio::time::timeout(timeout, opener.open(name)).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%name, "Opening calendar timed out");
            Err(CalEditError::OpenTimeout(timeout.as_secs()))
        }
    }
}
