use anyhow::Result;
use dialoguer::Input;
use owo_colors::OwoColorize;

use caledit_core::editor::EditorKey;
use caledit_core::{CalendarComponent, CompEditor, ComponentKind};

use crate::FieldArgs;
use crate::commands::{self, Session};
use crate::parse;

pub async fn run(
    kind: ComponentKind,
    title: Option<String>,
    mut fields: FieldArgs,
    calendar: Option<String>,
    with_send: bool,
    assume_yes: bool,
) -> Result<()> {
    let session = Session::load(assume_yes)?;
    let interactive = session.interactive && title.is_none();

    let title = match title {
        Some(t) => t,
        None if interactive => Input::<String>::new()
            .with_prompt("  Title")
            .allow_empty(true)
            .interact_text()?,
        None => String::new(),
    };

    if kind == ComponentKind::Event && fields.start.is_none() {
        if !interactive {
            anyhow::bail!("An event needs a start. Use --start to give one.");
        }
        let start = prompt_with_retry("  When?")?;
        fields.start = Some(start);
    }

    if interactive && fields.location.is_none() && kind == ComponentKind::Event {
        let location: String = Input::new()
            .with_prompt("  Where? (skip)")
            .default(String::new())
            .show_default(false)
            .interact_text()?;
        if !location.is_empty() {
            fields.location = Some(location);
        }
    }

    let name = session.resolve_calendar(calendar)?;
    let target = session.open_calendar(&name)?;
    let organizer = commands::organizer_address(&session, &target);

    let component = CalendarComponent::new(kind);
    let key = EditorKey::new(&name, &component);
    let setup = session.setup(None, target);
    let shared = session
        .registry
        .find_or_open(key, || CompEditor::new(component, setup));
    let mut editor = shared.lock().await;
    let mut events = editor.subscribe();

    let mut field_error = None;
    editor.edit(|form| {
        form.summary = title;
        field_error = commands::apply_fields(form, &fields, organizer.as_deref()).err();
    })?;
    if let Some(e) = field_error {
        editor.close();
        return Err(e);
    }

    if interactive {
        println!();
    }
    let summary = editor.form().summary.clone();
    if commands::save_and_close(&mut editor, &mut events, with_send).await? {
        println!("{}", format!("  Created: {}", summary).green());
        println!("{}", format!("  UID: {}", editor.component().uid).dimmed());
    } else {
        editor.close();
    }

    Ok(())
}

/// Ask for a date/time until it parses, returning the raw text.
fn prompt_with_retry(prompt: &str) -> Result<String> {
    loop {
        let input: String = Input::new().with_prompt(prompt).interact_text()?;
        match parse::parse_datetime(&input) {
            Ok(_) => return Ok(input),
            Err(e) => eprintln!("  {}", e.to_string().red()),
        }
    }
}
