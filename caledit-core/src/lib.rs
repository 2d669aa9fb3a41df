//! Core of caledit, a calendar component editor.
//!
//! This crate provides:
//! - `component` and `ics`: events, tasks and memos, and their iCalendar form
//! - `store`: the calendar store seam, with directory-backed and in-memory stores
//! - `itip`: scheduling messages and their transports
//! - `save`: the save-and-notify pipeline
//! - `editor`: the component editor that drives it, and the registry of open editors

pub mod activity;
pub mod alert;
pub mod caledit;
pub mod component;
pub mod config;
pub mod editor;
pub mod error;
pub mod ics;
pub mod identity;
pub mod itip;
pub mod save;
pub mod store;
pub mod timezone;

pub use activity::Activity;
pub use alert::Alert;
pub use caledit::Caledit;
pub use component::{CalendarComponent, ComponentKind, EventTime};
pub use editor::{CompEditor, EditorEvent, EditorFlags, EditorRegistry, EditorSetup};
pub use error::{CalEditError, CalEditResult};
pub use identity::Identity;
pub use store::{ComponentStore, RecurrenceScope, StoreHandle};
