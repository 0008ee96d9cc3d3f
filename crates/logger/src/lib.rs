//! Core logging types shared by Proven log sinks.
//!
//! This crate holds the pieces every sink agrees on:
//! - [`Record`], the value handed from callers to sinks
//! - [`Level`] and its fixed-width display codes
//! - the [`Logger`] trait implemented by sinks
//! - [`PatternFormatter`], which renders records through `%X` templates
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod level;
mod logger;
mod pattern;
mod record;

pub use level::Level;
pub use logger::{Logger, LoggerExt};
pub use pattern::{FORMAT_ABBREV, FORMAT_DEFAULT, FORMAT_MILLIS, FORMAT_SHORT, PatternFormatter};
pub use record::Record;
