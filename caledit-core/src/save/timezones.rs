//! Make every timezone a component references available on the target calendar.

use tracing::{debug, instrument};

use super::{SaveErrorKind, SaveFailure};
use crate::activity::Activity;
use crate::alert::{Alert, FAILED_ADD_TIMEZONE};
use crate::component::CalendarComponent;
use crate::store::ComponentStore;
use crate::timezone::Timezone;

/// Resolve each distinct non-UTC TZID of `comp` on `lookup` (falling back to
/// the builtin table) and add it to `target`.
#[instrument(skip_all, fields(uid = %comp.uid))]
pub async fn sync_timezones(
    comp: &CalendarComponent,
    lookup: &dyn ComponentStore,
    target: &dyn ComponentStore,
    activity: &Activity,
) -> Result<(), SaveFailure> {
    for tzid in comp.tzids() {
        if activity.is_cancelled() {
            return Err(SaveFailure::cancelled(
                SaveErrorKind::TimezoneResolutionFailed,
                Alert::new(FAILED_ADD_TIMEZONE),
            ));
        }

        let zone = match lookup.get_timezone(&tzid).await {
            Ok(zone) => zone,
            Err(e) => {
                debug!(%tzid, error = %e, "Timezone not on calendar, trying builtin table");
                Timezone::builtin(&tzid).ok_or_else(|| {
                    SaveFailure::new(
                        SaveErrorKind::TimezoneResolutionFailed,
                        Alert::new(FAILED_ADD_TIMEZONE)
                            .with_detail(format!("Unknown timezone \"{}\"", tzid)),
                    )
                })?
            }
        };

        target.add_timezone(&zone).await.map_err(|e| {
            SaveFailure::new(
                SaveErrorKind::TimezoneResolutionFailed,
                Alert::new(FAILED_ADD_TIMEZONE)
                    .with_argument(target.display_name())
                    .with_detail(e.to_string()),
            )
        })?;
        debug!(%tzid, "Timezone added to target");
    }

    Ok(())
}
