use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use caledit_core::editor::StoreOpener;
use caledit_core::{Caledit, CalEditResult, StoreHandle};

/// Opens calendars from the user's calendar directory.
pub struct CalendarOpener {
    caledit: Caledit,
}

impl CalendarOpener {
    pub fn new(caledit: Caledit) -> Self {
        CalendarOpener { caledit }
    }
}

#[async_trait]
impl StoreOpener for CalendarOpener {
    async fn open(&self, name: &str) -> CalEditResult<StoreHandle> {
        let caledit = self.caledit.clone();
        let name = name.to_string();
        debug!(%name, "Opening calendar");

        // Reading the calendar's config touches the filesystem synchronously.
        let store = tokio::task::spawn_blocking(move || caledit.open_calendar(&name))
            .await
            .map_err(std::io::Error::from)??;
        Ok(Arc::new(store))
    }
}
