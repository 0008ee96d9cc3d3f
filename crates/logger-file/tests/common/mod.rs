//! Test helpers shared by the file logger integration tests

#![allow(dead_code)]

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use proven_logger::{Level, Record};
use proven_logger_file::{ErrorSink, FileLogger, FileLoggerConfig};

/// Error sink that keeps everything reported in memory.
#[derive(Clone, Default)]
pub struct CapturedErrors {
    buffer: Arc<Mutex<Vec<u8>>>,
    failing: Arc<AtomicBool>,
}

impl CapturedErrors {
    /// Everything reported so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    /// Make every write fail (true) or succeed again (false).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sink feeding this capture.
    pub fn sink(&self) -> ErrorSink {
        ErrorSink::new(self.clone())
    }
}

impl Write for CapturedErrors {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("sink unavailable"));
        }
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Start a logger reporting into a fresh capture.
pub async fn start(config: FileLoggerConfig) -> (FileLogger, CapturedErrors) {
    let errors = CapturedErrors::default();
    let logger = FileLogger::with_error_sink(config, errors.sink())
        .await
        .unwrap();
    (logger, errors)
}

/// An info record from the test source.
pub fn record(message: impl Into<String>) -> Record {
    Record::new(Level::Info, "test", message)
}

/// Sorted names of the entries in `dir`.
pub fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Contents of `dir/name`.
pub fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}
