//! `%X` template rendering for log lines, headers and trailers.
//!
//! Recognized tokens:
//!
//! | token | output |
//! |-------|--------|
//! | `%A`  | time with milliseconds, `15:04:05.000` |
//! | `%T`  | time with zone, `15:04:05 UTC` |
//! | `%t`  | short time, `15:04` |
//! | `%D`  | date, `2006/01/02` |
//! | `%d`  | short date, `01/02/06` |
//! | `%L`  | four-letter level code |
//! | `%S`  | source |
//! | `%M`  | message |
//!
//! Unknown token characters are dropped; the text following them is kept.

use crate::Record;
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Timelike, Utc};

/// `[2009/02/13 23:31:30 UTC] [EROR] (source) message`
pub const FORMAT_DEFAULT: &str = "[%D %T] [%L] (%S) %M";
/// `[2009/02/13 23:31:30.123] [EROR] (source) message`
pub const FORMAT_MILLIS: &str = "[%D %A] [%L] (%S) %M";
/// `[23:31 02/13/09] [EROR] message`
pub const FORMAT_SHORT: &str = "[%t %d] [%L] %M";
/// `[EROR] message`
pub const FORMAT_ABBREV: &str = "[%L] %M";

#[derive(Debug, Default)]
struct DateCache {
    day: Option<(i32, u32, u32)>,
    long: String,
    short: String,
}

#[derive(Debug, Default)]
struct TimeCache {
    second: Option<i64>,
    long: String,
    short: String,
}

#[derive(Debug, Default)]
struct MillisCache {
    millis: Option<i64>,
    text: String,
}

/// Renders records through `%X` templates.
///
/// Each formatter keeps its own date/time caches, so an instance must be
/// owned by a single task (or guarded by the caller). Two sinks never share
/// one.
#[derive(Debug, Default)]
pub struct PatternFormatter {
    utc: bool,
    date: DateCache,
    time: TimeCache,
    millis: MillisCache,
}

impl PatternFormatter {
    /// Formatter rendering timestamps in the local time zone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter rendering timestamps in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            utc: true,
            ..Self::default()
        }
    }

    /// Render `record` through `template`, terminated by a single newline.
    ///
    /// An empty template renders as the empty string (no newline), which is
    /// how unset headers and trailers disappear.
    pub fn render(&mut self, template: &str, record: &Record) -> String {
        if template.is_empty() {
            return String::new();
        }

        self.refresh(record.created);

        let mut out = String::with_capacity(template.len() + record.message.len() + 32);
        for (i, piece) in template.split('%').enumerate() {
            if i == 0 {
                out.push_str(piece);
                continue;
            }

            let mut chars = piece.chars();
            let Some(token) = chars.next() else {
                continue;
            };

            match token {
                'A' => out.push_str(&self.millis.text),
                'T' => out.push_str(&self.time.long),
                't' => out.push_str(&self.time.short),
                'D' => out.push_str(&self.date.long),
                'd' => out.push_str(&self.date.short),
                'L' => out.push_str(record.level.code()),
                'S' => out.push_str(&record.source),
                'M' => out.push_str(&record.message),
                _ => {}
            }
            out.push_str(chars.as_str());
        }
        out.push('\n');

        out
    }

    fn refresh(&mut self, created: DateTime<Utc>) {
        let (naive, local) = if self.utc {
            (created.naive_utc(), None)
        } else {
            let local = created.with_timezone(&Local);
            (local.naive_local(), Some(local))
        };

        let millis = created.timestamp_millis();
        if self.millis.millis != Some(millis) {
            self.millis.millis = Some(millis);
            self.millis.text = format!(
                "{:02}:{:02}:{:02}.{:03}",
                naive.hour(),
                naive.minute(),
                naive.second(),
                (naive.nanosecond() / 1_000_000).min(999)
            );
        }

        let second = created.timestamp();
        if self.time.second != Some(second) {
            let zone = local.map_or_else(|| "UTC".to_string(), |l| l.format("%Z").to_string());
            self.time.second = Some(second);
            self.time.long = format!(
                "{:02}:{:02}:{:02} {zone}",
                naive.hour(),
                naive.minute(),
                naive.second()
            );
            self.time.short = format!("{:02}:{:02}", naive.hour(), naive.minute());
        }

        self.refresh_date(&naive);
    }

    fn refresh_date(&mut self, naive: &NaiveDateTime) {
        let day = (naive.year(), naive.month(), naive.day());
        if self.date.day == Some(day) {
            return;
        }

        self.date.day = Some(day);
        self.date.long = format!("{:04}/{:02}/{:02}", day.0, day.1, day.2);
        self.date.short = format!("{:02}/{:02}/{:02}", day.1, day.2, day.0.rem_euclid(100));
    }
}
