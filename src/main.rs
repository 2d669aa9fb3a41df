mod commands;
mod opener;
mod parse;
mod prompt;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use caledit_core::ComponentKind;

#[derive(Parser)]
#[command(name = "caledit")]
#[command(about = "Edit events, tasks and memos in your local calendars and notify their attendees")]
struct Cli {
    /// Log what the editor is doing
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer every question with its default instead of asking
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List calendars
    Calendars,
    /// Create a new event, task or memo
    New {
        /// What to create
        #[arg(short, long, value_enum, default_value_t = KindArg::Event)]
        kind: KindArg,

        /// Summary
        title: Option<String>,

        #[command(flatten)]
        fields: FieldArgs,

        /// Calendar to create it in (defaults to default_calendar from config)
        #[arg(short, long)]
        calendar: Option<String>,

        /// Don't send scheduling messages to attendees
        #[arg(long)]
        no_send: bool,
    },
    /// Change an existing component
    Edit {
        /// UID of the component
        uid: String,

        /// Recurrence id of a single occurrence (e.g. "20250310T100000")
        #[arg(long)]
        rid: Option<String>,

        /// New summary
        #[arg(short, long)]
        title: Option<String>,

        #[command(flatten)]
        fields: FieldArgs,

        /// Remove an attendee (repeatable)
        #[arg(long = "remove-attendee")]
        remove_attendees: Vec<String>,

        /// Calendar the component is in
        #[arg(short, long)]
        calendar: Option<String>,

        /// Move the component to another calendar
        #[arg(long = "move-to")]
        move_to: Option<String>,

        /// Don't send scheduling messages to attendees
        #[arg(long)]
        no_send: bool,
    },
    /// Show a component and its detached occurrences
    Show {
        /// UID of the component
        uid: String,

        /// Calendar the component is in
        #[arg(short, long)]
        calendar: Option<String>,
    },
}

/// Field values shared by `new` and `edit`.
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    /// Start date/time (e.g., "2025-03-20", "2025-03-20 15:00" or "friday 3pm")
    #[arg(short, long)]
    pub start: Option<String>,

    /// End date/time, or due date for tasks
    #[arg(short, long, conflicts_with = "duration")]
    pub end: Option<String>,

    /// Duration (e.g., "30m", "1h", "2h30m")
    #[arg(short, long, conflicts_with = "end")]
    pub duration: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub location: Option<String>,

    /// Invite an attendee (repeatable)
    #[arg(short, long = "attendee")]
    pub attendees: Vec<String>,

    /// Attach a local file (repeatable)
    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,

    /// Add a reminder, in minutes before the start (repeatable)
    #[arg(long = "remind")]
    pub reminders: Vec<i64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Event,
    Task,
    Memo,
}

impl From<KindArg> for ComponentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Event => ComponentKind::Event,
            KindArg::Task => ComponentKind::Task,
            KindArg::Memo => ComponentKind::Memo,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "caledit=debug,caledit_core=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Calendars => commands::calendars::run(),
        Commands::New {
            kind,
            title,
            fields,
            calendar,
            no_send,
        } => commands::new::run(kind.into(), title, fields, calendar, !no_send, cli.yes).await,
        Commands::Edit {
            uid,
            rid,
            title,
            fields,
            remove_attendees,
            calendar,
            move_to,
            no_send,
        } => {
            let changes = commands::edit::Changes {
                title,
                fields,
                remove_attendees,
                move_to,
            };
            commands::edit::run(uid, rid, changes, calendar, !no_send, cli.yes).await
        }
        Commands::Show { uid, calendar } => commands::show::run(uid, calendar).await,
    }
}
