//! ICS file generation and parsing.
//!
//! This module handles reading and writing .ics files according to RFC 5545,
//! and the METHOD-carrying messages of RFC 5546.

mod generate;
mod parse;

pub use generate::{PRODID, generate_ics, generate_itip};
pub use parse::parse_component;
