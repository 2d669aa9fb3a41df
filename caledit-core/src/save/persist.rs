//! Write a component to its target calendar.
//!
//! Steps, in order: timezones, attachments, create / modify / move, removal
//! from the previous calendar, re-fetch. Nothing is rolled back: a failure
//! after a successful write leaves that write in place.

use tracing::{debug, info, instrument, warn};

use super::{JobContext, JobOutcome, PersistedJob, SaveErrorKind, SaveFailure, SaveJob};
use super::{attachments, timezones};
use crate::activity::Activity;
use crate::alert::Alert;
use crate::component::CalendarComponent;
use crate::store::{ComponentStore, RecurrenceScope, StoreError, StoreResult};

/// Whether `comp` exists on `store`, either as itself or, for an instance,
/// through its recurrence master.
async fn is_on_store(store: &dyn ComponentStore, comp: &CalendarComponent) -> bool {
    let rid = comp.recurrence_id_string();
    if crate::store::object_exists(store, &comp.uid, rid.as_deref()).await {
        return true;
    }
    rid.is_some() && crate::store::object_exists(store, &comp.uid, None).await
}

fn failure(kind: SaveErrorKind, alert: Alert, error: &StoreError) -> SaveFailure {
    let alert = alert.with_detail(error.to_string());
    if *error == StoreError::Cancelled {
        SaveFailure::cancelled(kind, alert)
    } else {
        SaveFailure::new(kind, alert)
    }
}

fn check(activity: &Activity) -> StoreResult<()> {
    if activity.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}

#[instrument(skip_all, fields(uid = %job.component.uid, target = %job.ctx.target.source_uid()))]
pub async fn run(job: SaveJob, activity: Activity) -> Result<PersistedJob, JobOutcome> {
    let SaveJob { ctx, mut component } = job;

    match write(&ctx, &mut component, &activity).await {
        Ok((object_created, warnings)) => Ok(PersistedJob {
            ctx,
            component,
            object_created,
            warnings,
        }),
        Err(failure) => {
            warn!(error = %failure, "Saving failed");
            Err(JobOutcome::failed(ctx, component, failure))
        }
    }
}

async fn write(
    ctx: &JobContext,
    component: &mut CalendarComponent,
    activity: &Activity,
) -> Result<(bool, Vec<SaveFailure>), SaveFailure> {
    let kind = component.kind;
    let target = ctx.target.as_ref();
    let source = ctx.source.as_deref().filter(|_| ctx.source_differs());
    let mut warnings = Vec::new();

    timezones::sync_timezones(component, source.unwrap_or(target), target, activity).await?;
    attachments::materialize(component, target, activity).await?;

    let orig_uid = component.uid.clone();
    let has_recurrences = component.has_recurrences();
    let mut on_target = is_on_store(target, component).await;
    let mut already_moved = false;

    if let Some(source) = source {
        if !on_target && has_recurrences && is_on_store(source, component).await {
            transfer_series(source, target, &orig_uid, activity)
                .await
                .map_err(|e| failure(SaveErrorKind::ModifyFailed, Alert::failed("modify", kind), &e))?;
            info!(from = %source.source_uid(), "Moved series to target calendar");
            on_target = true;
            already_moved = true;
        }
    }

    let mut server_uid = None;
    let mut object_created = false;

    if on_target {
        let modify_failed = |e: &StoreError| {
            failure(
                SaveErrorKind::ModifyFailed,
                Alert::failed("modify", kind).with_argument(target.display_name()),
                e,
            )
        };

        let mut clone = component.clone();
        if has_recurrences && ctx.scope == RecurrenceScope::All {
            sanitize_recurrence_master(&mut clone, target)
                .await
                .map_err(|e| modify_failed(&e))?;
        }
        if ctx.scope == RecurrenceScope::This {
            clone.strip_recurrence();
        }

        check(activity).map_err(|e| modify_failed(&e))?;
        target
            .modify_object(&clone, ctx.scope)
            .await
            .map_err(|e| modify_failed(&e))?;
        debug!(scope = ?ctx.scope, "Modified component");
    } else {
        let create_failed = |e: &StoreError| {
            failure(
                SaveErrorKind::CreateFailed,
                Alert::failed("create", kind).with_argument(target.display_name()),
                e,
            )
        };

        check(activity).map_err(|e| create_failed(&e))?;
        let uid = target
            .create_object(component)
            .await
            .map_err(|e| create_failed(&e))?;
        debug!(%uid, "Created component");
        server_uid = Some(uid);
        object_created = true;
    }

    if let Some(source) = source {
        if !already_moved && is_on_store(source, component).await {
            let scope = if component.is_instance() || has_recurrences {
                RecurrenceScope::All
            } else {
                RecurrenceScope::This
            };

            let removed = match check(activity) {
                Ok(()) => source.remove_object(&orig_uid, None, scope).await,
                Err(e) => Err(e),
            };
            if let Err(e) = removed {
                warn!(error = %e, "Could not remove component from previous calendar");
                warnings.push(failure(
                    SaveErrorKind::RemoveFromSourceFailed,
                    Alert::failed("remove", kind).with_argument(source.display_name()),
                    &e,
                ));
            }
        }
    }

    if let Some(uid) = server_uid {
        component.uid = uid;
    }

    if !ctx.close_after_save {
        match refetch(target, component).await {
            Ok(refreshed) => *component = refreshed,
            Err(e) => {
                warn!(error = %e, "Could not re-read saved component");
                warnings.push(failure(
                    SaveErrorKind::RefetchFailed,
                    Alert::failed("get", kind).with_argument(target.display_name()),
                    &e,
                ));
            }
        }
    }

    Ok((object_created, warnings))
}

/// Copy the master and every detached instance of `uid` to `target`, then
/// remove the series from `source`.
async fn transfer_series(
    source: &dyn ComponentStore,
    target: &dyn ComponentStore,
    uid: &str,
    activity: &Activity,
) -> StoreResult<()> {
    for object in source.get_objects_for_uid(uid).await? {
        check(activity)?;
        let rid = object.recurrence_id_string();
        if crate::store::object_exists(target, uid, rid.as_deref()).await {
            target.modify_object(&object, RecurrenceScope::All).await?;
        } else {
            target.create_object(&object).await?;
        }
    }

    check(activity)?;
    source.remove_object(uid, None, RecurrenceScope::All).await
}

/// Prepare an edited instance to be written as the whole series.
///
/// When the instance starts on its own recurrence date, its start and end move
/// onto the master's date, keeping the time of day and the day span. The
/// recurrence-id is dropped either way.
async fn sanitize_recurrence_master(
    comp: &mut CalendarComponent,
    store: &dyn ComponentStore,
) -> StoreResult<()> {
    let master = store.get_object(&comp.uid, None).await?;

    if let (Some(rid), Some(start)) = (&comp.recurrence_id, &comp.start) {
        if rid.date() == start.date() {
            let (Some(master_start), Some(end)) = (&master.start, &comp.end) else {
                return Err(StoreError::InvalidObject(
                    "Recurrence master or instance lacks a start or end".to_string(),
                ));
            };

            let span = (end.date() - start.date()).num_days();
            let new_start = start.with_date(master_start.date());
            let mut new_end = end.with_date(master_start.date()).add_days(span);
            if new_start.is_date() && new_end.is_date() && new_start.date() == new_end.date() {
                new_end = new_end.add_days(1);
            }

            comp.start = Some(new_start);
            comp.end = Some(new_end);
            if comp.sequence > master.sequence {
                comp.sequence -= 1;
            }
        }
    }

    comp.recurrence_id = None;
    Ok(())
}

/// Re-read the saved component. An instance that is not stored on its own is
/// read through its master, with the recurrence-id put back.
async fn refetch(
    store: &dyn ComponentStore,
    comp: &CalendarComponent,
) -> StoreResult<CalendarComponent> {
    let rid = comp.recurrence_id_string();
    let mut refreshed = match store.get_object(&comp.uid, rid.as_deref()).await {
        Err(StoreError::NotFound) if rid.is_some() => {
            let mut master = store.get_object(&comp.uid, None).await?;
            master.recurrence_id = comp.recurrence_id.clone();
            master
        }
        other => other?,
    };
    refreshed.new_attendees = comp.new_attendees.clone();
    Ok(refreshed)
}
