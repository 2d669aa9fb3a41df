use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use owo_colors::OwoColorize;

use caledit_core::editor::EditorKey;
use caledit_core::store::StoreError;
use caledit_core::{CalendarComponent, CompEditor, EventTime, StoreHandle};

use crate::FieldArgs;
use crate::commands::{self, Session};

/// Changes requested on the command line.
pub struct Changes {
    pub title: Option<String>,
    pub fields: FieldArgs,
    pub remove_attendees: Vec<String>,
    pub move_to: Option<String>,
}

pub async fn run(
    uid: String,
    rid: Option<String>,
    changes: Changes,
    calendar: Option<String>,
    with_send: bool,
    assume_yes: bool,
) -> Result<()> {
    let session = Session::load(assume_yes)?;
    let name = session.resolve_calendar(calendar)?;
    let source = session.open_calendar(&name)?;
    let component = load_component(&source, &uid, rid.as_deref()).await?;

    let key = EditorKey::new(&name, &component);
    let setup = session.setup(Some(source.clone()), source);
    let shared = session
        .registry
        .find_or_open(key, || CompEditor::new(component, setup));
    let mut editor = shared.lock().await;
    let mut events = editor.subscribe();

    if let Some(ref move_to) = changes.move_to {
        let target = session.resolve_calendar(Some(move_to.clone()))?;
        let before = editor.target().source_uid().to_string();
        editor.set_target_store(session.opener(), &target)?;
        commands::wait_for_target(&mut editor, &target).await;
        commands::print_events(&mut events);
        if target != name && editor.target().source_uid() == before {
            editor.close();
            anyhow::bail!("Could not switch to calendar '{}'", target);
        }
    }

    let organizer = commands::organizer_address(&session, editor.target());
    let mut field_error = None;
    editor.edit(|form| {
        if let Some(title) = changes.title {
            form.summary = title;
        }
        for address in &changes.remove_attendees {
            form.remove_attendee(address);
        }
        field_error = commands::apply_fields(form, &changes.fields, organizer.as_deref()).err();
    })?;
    if let Some(e) = field_error {
        editor.close();
        return Err(e);
    }

    let summary = editor.form().summary.clone();
    if commands::save_and_close(&mut editor, &mut events, with_send).await? {
        println!("{}", format!("  Updated: {}", summary).green());
        return Ok(());
    }

    // A failed save leaves the edits in the editor; offer another go.
    if session.interactive
        && !editor.is_closed()
        && editor.prompt_and_save_changes(with_send).await?
    {
        commands::print_events(&mut events);
        println!("{}", format!("  Updated: {}", summary).green());
        return Ok(());
    }

    commands::print_events(&mut events);
    editor.close();
    println!("{}", "  Not saved".yellow());
    Ok(())
}

/// The stored component, or for an occurrence that was never detached, a
/// copy of the master moved to that occurrence. The copy keeps the series
/// rules; saving it for one occurrence strips them.
async fn load_component(
    store: &StoreHandle,
    uid: &str,
    rid: Option<&str>,
) -> Result<CalendarComponent> {
    let not_found = || format!("No component with UID '{}' in {}", uid, store.display_name());

    match store.get_object(uid, rid).await {
        Ok(comp) => Ok(comp),
        Err(StoreError::NotFound) if rid.is_some() => {
            let master = store.get_object(uid, None).await.with_context(not_found)?;
            let rid = rid.unwrap_or_default();
            if !master.has_recurrences() {
                anyhow::bail!("'{}' does not repeat", master);
            }
            virtual_instance(&master, rid)
        }
        Err(e) => Err(e).with_context(not_found),
    }
}

fn virtual_instance(master: &CalendarComponent, rid: &str) -> Result<CalendarComponent> {
    let occurrence = parse_rid(rid, master.start.as_ref())
        .with_context(|| format!("Invalid recurrence id: \"{}\"", rid))?;

    let mut instance = master.clone();
    if let (Some(start), Some(end)) = (&master.start, &master.end) {
        instance.end = Some(match (naive(start), naive(end), naive(&occurrence)) {
            (Some(s), Some(e), Some(o)) => with_naive(end, o + (e - s)),
            _ => end.with_date(occurrence.date() + (end.date() - start.date())),
        });
    }
    instance.start = Some(occurrence.clone());
    instance.recurrence_id = Some(occurrence);
    Ok(instance)
}

/// Recurrence id in iCalendar form, typed like the master's start.
fn parse_rid(rid: &str, master_start: Option<&EventTime>) -> Option<EventTime> {
    if let Ok(date) = NaiveDate::parse_from_str(rid, "%Y%m%d") {
        return Some(EventTime::Date(date));
    }
    if let Some(utc) = rid.strip_suffix('Z') {
        let dt = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(EventTime::DateTimeUtc(dt.and_utc()));
    }
    let dt = NaiveDateTime::parse_from_str(rid, "%Y%m%dT%H%M%S").ok()?;
    match master_start.and_then(EventTime::tzid) {
        Some(tzid) => Some(EventTime::DateTimeZoned {
            datetime: dt,
            tzid: tzid.to_string(),
        }),
        None => Some(EventTime::DateTimeFloating(dt)),
    }
}

fn naive(time: &EventTime) -> Option<NaiveDateTime> {
    match time {
        EventTime::Date(_) => None,
        EventTime::DateTimeUtc(dt) => Some(dt.naive_utc()),
        EventTime::DateTimeFloating(dt) => Some(*dt),
        EventTime::DateTimeZoned { datetime, .. } => Some(*datetime),
    }
}

fn with_naive(like: &EventTime, dt: NaiveDateTime) -> EventTime {
    match like {
        EventTime::Date(_) => EventTime::Date(dt.date()),
        EventTime::DateTimeUtc(_) => EventTime::DateTimeUtc(dt.and_utc()),
        EventTime::DateTimeFloating(_) => EventTime::DateTimeFloating(dt),
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: dt,
            tzid: tzid.clone(),
        },
    }
}
