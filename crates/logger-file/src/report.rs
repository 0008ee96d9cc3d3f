//! Throttled failure reporting.
//!
//! A sink cannot log its own failures through itself, so failures go to an
//! [`ErrorSink`] (stderr by default). When the sink is failing too, failures
//! are counted and summarized by the next report that gets through.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

/// Destination for failure messages, shared by the writer and the background
/// worker.
#[derive(Clone)]
pub struct ErrorSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ErrorSink {
    /// Sink writing to `writer`.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Sink writing to the process's standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Write one line to the sink.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the line could not be written.
    pub fn emit(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_fmt(args)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    /// Write one line, noting in `tracing` if even that fails.
    pub(crate) fn emit_best_effort(&self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.emit(args) {
            tracing::warn!("error sink unavailable: {e}");
        }
    }
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink").finish_non_exhaustive()
    }
}

/// Which class of failure a tracker counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A record could not be written
    Write,
    /// The active file could not be rotated
    Rotation,
}

/// Counts failures that could not be reported and summarizes them once
/// reporting works again.
///
/// Each call makes at most two emission attempts: one for the pending
/// summary, one for the new failure.
#[derive(Debug)]
pub struct FailureTracker {
    kind: FailureKind,
    pending: u64,
}

impl FailureTracker {
    /// Tracker for `kind` with nothing pending.
    #[must_use]
    pub const fn new(kind: FailureKind) -> Self {
        Self { kind, pending: 0 }
    }

    /// Failures not yet reported.
    #[must_use]
    pub const fn pending(&self) -> u64 {
        self.pending
    }

    /// Report the outcome of one operation on `path`.
    ///
    /// `Ok` only flushes a pending summary; `Err` also reports the failure.
    pub fn report<E: fmt::Display>(
        &mut self,
        sink: &ErrorSink,
        path: &Path,
        outcome: Result<(), &E>,
    ) {
        if self.pending != 0 {
            if self.emit_summary(sink, path).is_err() {
                if outcome.is_err() {
                    self.pending += 1;
                }
                return;
            }
            self.pending = 0;
        }

        if let Err(err) = outcome {
            let emitted = match self.kind {
                FailureKind::Write => {
                    sink.emit(format_args!("FileLogger({path:?}): Write failed: {err}"))
                }
                FailureKind::Rotation => {
                    sink.emit(format_args!("FileLogger({path:?}): Rotation failed: {err}"))
                }
            };
            if emitted.is_err() {
                self.pending += 1;
            }
        }
    }

    fn emit_summary(&self, sink: &ErrorSink, path: &Path) -> io::Result<()> {
        let count = self.pending;
        match self.kind {
            FailureKind::Write => sink.emit(format_args!(
                "FileLogger({path:?}): Dropped {count} previous log message(s)"
            )),
            FailureKind::Rotation => sink.emit(format_args!(
                "FileLogger({path:?}): {count} previous rotation failures occurred"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory writer that can be switched into a failing state.
    #[derive(Clone, Default)]
    pub(crate) struct FlakyWriter {
        pub(crate) buffer: Arc<Mutex<Vec<u8>>>,
        pub(crate) failing: Arc<AtomicBool>,
    }

    impl FlakyWriter {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buffer.lock()).into_owned()
        }

        pub(crate) fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(io::Error::other("sink unavailable"));
            }
            self.buffer.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn failure() -> io::Error {
        io::Error::other("disk full")
    }

    #[test]
    fn test_failure_is_reported_immediately() {
        let writer = FlakyWriter::default();
        let sink = ErrorSink::new(writer.clone());
        let mut tracker = FailureTracker::new(FailureKind::Write);

        tracker.report(&sink, Path::new("app.log"), Err(&failure()));

        assert_eq!(tracker.pending(), 0);
        assert_eq!(
            writer.contents(),
            "FileLogger(\"app.log\"): Write failed: disk full\n"
        );
    }

    #[test]
    fn test_unreportable_failures_are_summarized_once() {
        let writer = FlakyWriter::default();
        let sink = ErrorSink::new(writer.clone());
        let mut tracker = FailureTracker::new(FailureKind::Write);
        let path = Path::new("app.log");

        writer.set_failing(true);
        for _ in 0..5 {
            tracker.report(&sink, path, Err(&failure()));
        }
        assert_eq!(tracker.pending(), 5);

        writer.set_failing(false);
        tracker.report::<io::Error>(&sink, path, Ok(()));

        assert_eq!(tracker.pending(), 0);
        let contents = writer.contents();
        assert_eq!(
            contents,
            "FileLogger(\"app.log\"): Dropped 5 previous log message(s)\n"
        );
        assert_eq!(contents.matches('\n').count(), 1);
    }

    #[test]
    fn test_clean_report_without_pending_is_silent() {
        let writer = FlakyWriter::default();
        let sink = ErrorSink::new(writer.clone());
        let mut tracker = FailureTracker::new(FailureKind::Rotation);

        tracker.report::<io::Error>(&sink, Path::new("app.log"), Ok(()));

        assert!(writer.contents().is_empty());
    }

    #[test]
    fn test_clean_report_while_sink_down_does_not_count() {
        let writer = FlakyWriter::default();
        let sink = ErrorSink::new(writer.clone());
        let mut tracker = FailureTracker::new(FailureKind::Rotation);
        let path = Path::new("app.log");

        writer.set_failing(true);
        tracker.report(&sink, path, Err(&failure()));
        tracker.report::<io::Error>(&sink, path, Ok(()));
        assert_eq!(tracker.pending(), 1);

        writer.set_failing(false);
        tracker.report(&sink, path, Err(&failure()));

        assert_eq!(tracker.pending(), 0);
        assert_eq!(
            writer.contents(),
            "FileLogger(\"app.log\"): 1 previous rotation failures occurred\n\
             FileLogger(\"app.log\"): Rotation failed: disk full\n"
        );
    }
}
