//! Configuration types for caledit.

mod calendar;
mod global;

pub use calendar::CalendarConfig;
pub use global::CaleditConfig;
