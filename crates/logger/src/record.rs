//! Log record type handed from callers to sinks

use crate::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single log record.
///
/// Records are owned values so they can be queued and moved across tasks
/// without borrowing from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Log level
    pub level: Level,
    /// Where the record came from (module, component, function)
    pub source: String,
    /// The log message
    pub message: String,
    /// When the record was created
    pub created: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the current time.
    pub fn new(level: Level, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            source: source.into(),
            message: message.into(),
            created: Utc::now(),
        }
    }

    /// Builder-style method for overriding the creation time
    #[must_use]
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// An empty record carrying only a timestamp, used to render headers and
    /// trailers.
    #[must_use]
    pub fn marker(created: DateTime<Utc>) -> Self {
        Self {
            level: Level::Info,
            source: String::new(),
            message: String::new(),
            created,
        }
    }
}
