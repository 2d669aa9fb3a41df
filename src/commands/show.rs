use anyhow::Result;

use crate::commands::Session;
use crate::render::Render;

pub async fn run(uid: String, calendar: Option<String>) -> Result<()> {
    let session = Session::load(true)?;
    let name = session.resolve_calendar(calendar)?;
    let store = session.open_calendar(&name)?;

    let components = store.get_objects_for_uid(&uid).await?;
    if components.is_empty() {
        anyhow::bail!("No component with UID '{}' in {}", uid, store.display_name());
    }

    for (i, comp) in components.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", comp.render());
    }

    Ok(())
}
