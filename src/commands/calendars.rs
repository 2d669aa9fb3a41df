use anyhow::Result;
use owo_colors::OwoColorize;

use caledit_core::Caledit;
use caledit_core::store::ComponentStore;

pub fn run() -> Result<()> {
    let caledit = Caledit::load()?;
    let names = caledit.calendars();

    if names.is_empty() {
        println!(
            "{}",
            format!("No calendars in {}", caledit.data_path().display()).dimmed()
        );
        return Ok(());
    }

    let default = caledit.default_calendar();
    for name in names {
        let store = match caledit.open_calendar(&name) {
            Ok(store) => store,
            Err(e) => {
                println!("📅 {} {}", name, e.to_string().red());
                continue;
            }
        };

        let mut line = format!("📅 {}", store.display_name());
        if store.display_name() != name {
            line.push_str(&format!(" ({})", name).dimmed().to_string());
        }
        if default.as_deref() == Some(name.as_str()) {
            line.push_str(&format!(" {}", "default".green()));
        }
        if store.is_readonly() {
            line.push_str(&format!(" {}", "read-only".yellow()));
        }
        println!("{}", line);

        if let Some(email) = store.cal_email_address() {
            println!("   {}", email.dimmed());
        }
        let capabilities: Vec<&str> = store.config().capabilities.iter().map(|c| c.as_str()).collect();
        if !capabilities.is_empty() {
            println!("   {}", capabilities.join(", ").dimmed());
        }
    }

    Ok(())
}
