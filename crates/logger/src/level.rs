//! Log severity levels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Finest-grained tracing output
    Finest,
    /// Fine-grained tracing output
    Fine,
    /// Debugging output
    Debug,
    /// Execution tracing
    Trace,
    /// Informational messages
    Info,
    /// Something unexpected but recoverable
    Warning,
    /// An operation failed
    Error,
    /// The process cannot continue normally
    Critical,
}

impl Level {
    /// All levels, least severe first.
    pub const ALL: [Self; 8] = [
        Self::Finest,
        Self::Fine,
        Self::Debug,
        Self::Trace,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Four-letter code used by `%L` in line templates.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Finest => "FNST",
            Self::Fine => "FINE",
            Self::Debug => "DEBG",
            Self::Trace => "TRAC",
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "EROR",
            Self::Critical => "CRIT",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_four_letters() {
        for level in Level::ALL {
            assert_eq!(level.code().len(), 4, "{level:?}");
        }
    }

    #[test]
    fn test_ordering() {
        assert!(Level::Critical > Level::Error);
        assert!(Level::Warning > Level::Info);
        assert!(Level::Finest < Level::Fine);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Level::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");

        let level: Level = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(level, Level::Critical);
    }
}
