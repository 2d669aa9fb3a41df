pub mod calendars;
pub mod edit;
pub mod new;
pub mod show;

use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Select;
use owo_colors::OwoColorize;
use tokio::sync::mpsc::UnboundedReceiver;

use caledit_core::component::{Attendee, Organizer, Reminder};
use caledit_core::editor::EditorForm;
use caledit_core::itip::OutboxTransport;
use caledit_core::{
    Caledit, CalEditError, CompEditor, EditorEvent, EditorFlags, EditorRegistry, EditorSetup,
    StoreHandle,
};

use crate::FieldArgs;
use crate::opener::CalendarOpener;
use crate::parse;
use crate::prompt::TerminalPrompter;
use crate::render::render_event;
use crate::utils::tui::create_spinner;

/// What every editing command needs: the loaded setup, the open-editor
/// registry and the way questions get answered.
pub struct Session {
    pub caledit: Caledit,
    pub registry: EditorRegistry,
    pub prompter: Arc<TerminalPrompter>,
    pub interactive: bool,
}

impl Session {
    pub fn load(assume_yes: bool) -> Result<Self> {
        let caledit = Caledit::load()?;
        require_calendars(&caledit)?;

        Ok(Session {
            caledit,
            registry: EditorRegistry::new(),
            prompter: Arc::new(TerminalPrompter::new(assume_yes)),
            interactive: !assume_yes,
        })
    }

    pub fn opener(&self) -> Arc<CalendarOpener> {
        Arc::new(CalendarOpener::new(self.caledit.clone()))
    }

    pub fn open_calendar(&self, name: &str) -> Result<StoreHandle> {
        let store = self.caledit.open_calendar(name)?;
        Ok(Arc::new(store))
    }

    /// Which calendar to use: the one named, the only one, the default one,
    /// or the user's pick.
    pub fn resolve_calendar(&self, name: Option<String>) -> Result<String> {
        let calendars = self.caledit.calendars();

        if let Some(name) = name {
            if calendars.contains(&name) {
                return Ok(name);
            }
            anyhow::bail!(
                "Calendar '{}' not found. Available: {}",
                name,
                calendars.join(", ")
            );
        }

        if calendars.len() == 1 {
            return Ok(calendars[0].clone());
        }

        if let Some(default) = self.caledit.default_calendar() {
            return Ok(default);
        }

        if !self.interactive {
            anyhow::bail!(
                "Multiple calendars found ({}). Use --calendar to specify one.",
                calendars.join(", ")
            );
        }

        let selection = Select::new()
            .with_prompt("  Calendar")
            .items(&calendars)
            .default(0)
            .interact()?;
        Ok(calendars[selection].clone())
    }

    pub fn setup(&self, source: Option<StoreHandle>, target: StoreHandle) -> EditorSetup {
        let identity = self.caledit.identity();
        let transport = OutboxTransport::new(self.caledit.outbox_path())
            .with_from(identity.addresses().first().cloned());

        EditorSetup {
            source,
            target,
            transport: Arc::new(transport),
            prompter: self.prompter.clone(),
            identity,
            flags: EditorFlags::default(),
        }
    }
}

fn require_calendars(caledit: &Caledit) -> Result<()> {
    if caledit.calendars().is_empty() {
        anyhow::bail!(
            "No calendars found in {}.\n\
            Create a directory there with a .caledit/config.toml inside it.",
            caledit.data_path().display()
        );
    }
    Ok(())
}

/// Fold command-line field values into the editor form.
pub fn apply_fields(form: &mut EditorForm, fields: &FieldArgs, organizer: Option<&str>) -> Result<()> {
    if let Some(ref start) = fields.start {
        form.start = Some(parse::parse_datetime(start)?);
    }

    if let Some(ref end) = fields.end {
        let start = form.start.as_ref();
        form.end = Some(match start {
            Some(start) => parse::parse_end(end, start)?,
            None => parse::parse_datetime(end)?,
        });
    } else if let Some(ref duration) = fields.duration {
        let start = form
            .start
            .as_ref()
            .context("A duration needs a start date/time")?;
        form.end = Some(parse::apply_duration(start, duration)?);
    } else if fields.start.is_some() && form.end.is_none() {
        form.end = form.start.as_ref().map(parse::default_end);
    }

    if let Some(ref description) = fields.description {
        form.description = description.clone();
    }
    if let Some(ref location) = fields.location {
        form.location = location.clone();
    }

    for address in &fields.attendees {
        form.add_attendee(Attendee::new(address));
    }
    if !form.attendees.is_empty()
        && form.organizer.is_none()
        && let Some(email) = organizer
    {
        form.organizer = Some(Organizer {
            email: email.to_string(),
            name: None,
            sent_by: None,
        });
    }

    for path in &fields.attachments {
        form.attach(parse::file_url(path)?);
    }
    for &minutes in &fields.reminders {
        form.reminders.push(Reminder { minutes });
    }

    Ok(())
}

/// The address to put in ORGANIZER for meetings the user creates.
pub fn organizer_address(session: &Session, target: &StoreHandle) -> Option<String> {
    target
        .cal_email_address()
        .or_else(|| session.caledit.identity().addresses().first().cloned())
}

/// Save and close the editor, showing a spinner while busy and printing what
/// happened. Ctrl-C cancels the save. Returns whether the component was saved.
pub async fn save_and_close(
    editor: &mut CompEditor,
    events: &mut UnboundedReceiver<EditorEvent>,
    with_send: bool,
) -> Result<bool> {
    match editor.save(with_send, true) {
        Ok(_) => {}
        Err(CalEditError::Cancelled) => {
            println!("{}", "  Not saved".yellow());
            return Ok(false);
        }
        Err(CalEditError::Validation(_)) => {
            print_events(events);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }

    let spinner = create_spinner(format!("  Saving {}", editor.kind().component_kind()));
    loop {
        let interrupted = tokio::select! {
            more = editor.process_next() => {
                if !more {
                    break;
                }
                false
            }
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            spinner.set_message("  Cancelling");
            editor.cancel();
        }
    }
    spinner.finish_and_clear();

    print_events(events);
    Ok(editor.is_closed())
}

/// Wait for a calendar switch started with `set_target_store` to settle.
pub async fn wait_for_target(editor: &mut CompEditor, name: &str) {
    let spinner = create_spinner(format!("  Opening {}", name));
    editor.wait_idle().await;
    spinner.finish_and_clear();
}

pub fn print_events(events: &mut UnboundedReceiver<EditorEvent>) {
    while let Ok(event) = events.try_recv() {
        if let Some(line) = render_event(&event) {
            println!("{}", line);
        }
    }
}
