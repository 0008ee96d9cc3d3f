//! Core logger trait

use crate::{Level, Record};

/// Sink for log records.
pub trait Logger: Send + Sync + 'static {
    /// Log a record
    fn log(&self, record: Record);

    /// Flush any buffered logs
    fn flush(&self);
}

/// Extension trait for convenient logging methods
pub trait LoggerExt: Logger {
    /// Log an error
    fn error(&self, source: &str, msg: impl Into<String>) {
        self.log(Record::new(Level::Error, source, msg));
    }

    /// Log a warning
    fn warn(&self, source: &str, msg: impl Into<String>) {
        self.log(Record::new(Level::Warning, source, msg));
    }

    /// Log info
    fn info(&self, source: &str, msg: impl Into<String>) {
        self.log(Record::new(Level::Info, source, msg));
    }

    /// Log debug
    fn debug(&self, source: &str, msg: impl Into<String>) {
        self.log(Record::new(Level::Debug, source, msg));
    }
}

// Implement for all loggers
impl<T: Logger + ?Sized> LoggerExt for T {}
