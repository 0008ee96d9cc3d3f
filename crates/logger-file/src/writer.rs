//! The writer loop: sole owner of the active file.
//!
//! Every mutation of the file handle and its counters happens on the task
//! running [`Writer::run`]; callers only reach it through the record queue
//! and the control channel.

use crate::config::{FileLoggerConfig, RotationPolicy};
use crate::error::{Error, Result};
use crate::naming::next_rotated_name;
use crate::report::{ErrorSink, FailureKind, FailureTracker};
use crate::worker::RetiredFile;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, TimeDelta, Utc};
use proven_logger::{PatternFormatter, Record};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

/// Requests that bypass the record queue.
#[derive(Debug)]
pub(crate) enum Control {
    /// Rotate now, or at the given nominal time
    Rotate {
        at: Option<DateTime<Local>>,
        done: oneshot::Sender<()>,
    },
    /// Replace the configuration if no record has been processed yet
    Reconfigure {
        config: Box<FileLoggerConfig>,
        done: oneshot::Sender<Result<()>>,
    },
}

/// State of the active file, owned by the writer task.
pub(crate) struct Writer {
    config: FileLoggerConfig,
    formatter: PatternFormatter,
    file: Option<File>,
    lines: u64,
    bytes: u64,
    open_day: u32,
    /// Startup recovery has run
    started: bool,
    /// A record has been processed; configuration is frozen
    frozen: bool,
    /// Modification time of the active file if it existed before we opened it
    existing_modified: Option<SystemTime>,
    write_failures: FailureTracker,
    rotation_failures: FailureTracker,
    tasks: flume::Sender<RetiredFile>,
    errors: ErrorSink,
}

impl Writer {
    /// Open the active file and return the state that will own it.
    pub(crate) async fn open(
        config: FileLoggerConfig,
        existing_modified: Option<SystemTime>,
        tasks: flume::Sender<RetiredFile>,
        errors: ErrorSink,
    ) -> Result<Self> {
        let mut writer = Self {
            config,
            formatter: PatternFormatter::new(),
            file: None,
            lines: 0,
            bytes: 0,
            open_day: Local::now().day(),
            started: false,
            frozen: false,
            existing_modified,
            write_failures: FailureTracker::new(FailureKind::Write),
            rotation_failures: FailureTracker::new(FailureKind::Rotation),
            tasks,
            errors,
        };
        writer.open_active().await?;

        Ok(writer)
    }

    /// Process control messages and records until the record queue closes.
    pub(crate) async fn run(
        mut self,
        records: flume::Receiver<Record>,
        control: flume::Receiver<Control>,
    ) {
        loop {
            tokio::select! {
                biased;

                Ok(message) = control.recv_async() => {
                    self.drain_queued(&records).await;
                    self.handle_control(message).await;
                }

                received = records.recv_async() => match received {
                    Ok(record) => self.accept(&record).await,
                    // Closed and drained
                    Err(_) => break,
                },
            }
        }

        self.close_active().await;
        tracing::debug!("writer for {} stopped", self.config.path.display());
    }

    /// Write the records already queued when a control message arrived, so
    /// a caller's requests apply after its earlier writes.
    async fn drain_queued(&mut self, records: &flume::Receiver<Record>) {
        for _ in 0..records.len() {
            match records.try_recv() {
                Ok(record) => self.accept(&record).await,
                Err(_) => break,
            }
        }
    }

    async fn accept(&mut self, record: &Record) {
        self.ensure_started().await;
        self.write_record(record).await;
    }

    async fn handle_control(&mut self, message: Control) {
        match message {
            Control::Rotate { at, done } => {
                self.ensure_started().await;
                let result = self.rotate(at.unwrap_or_else(Local::now)).await;
                self.report_rotation(&result);
                let _ = done.send(());
            }
            Control::Reconfigure { config, done } => {
                let _ = done.send(self.reconfigure(*config).await);
            }
        }
    }

    /// Replace the configuration. A changed header is written straight away
    /// if the active file has no records yet and won't be rotated on startup,
    /// so it always precedes the first record.
    async fn reconfigure(&mut self, config: FileLoggerConfig) -> Result<()> {
        if self.frozen {
            return Err(Error::ConfigurationFrozen);
        }
        if config.path != self.config.path {
            return Err(Error::Configuration(format!(
                "cannot move active file from {} to {}",
                self.config.path.display(),
                config.path.display()
            )));
        }
        if config.queue_depth != self.config.queue_depth {
            return Err(Error::Configuration(format!(
                "queue depth is fixed at {} once the logger is running",
                self.config.queue_depth
            )));
        }
        config.validate()?;

        let header_changed = config.header != self.config.header;
        self.config = config;

        if header_changed && self.lines == 0 && self.startup_rotation_due().is_none() {
            self.write_header().await;
        }

        Ok(())
    }

    /// Nominal time of the startup rotation, if one is still to come.
    fn startup_rotation_due(&self) -> Option<DateTime<Local>> {
        if self.started {
            return None;
        }

        let modified = DateTime::<Local>::from(self.existing_modified?);
        (modified.date_naive() != Local::now().date_naive()
            || self.config.rotation.rotate_on_startup)
            .then_some(modified)
    }

    /// Rotate a file left over from a previous run if it is from an earlier
    /// day or rotation on startup is requested. Runs once.
    async fn ensure_started(&mut self) {
        let due = self.startup_rotation_due();
        self.started = true;
        self.existing_modified = None;

        if let Some(at) = due {
            let result = self.rotate(at).await;
            self.report_rotation(&result);
        }
    }

    async fn write_record(&mut self, record: &Record) {
        self.frozen = true;

        if let Some(at) = rotation_due(
            &self.config.rotation,
            self.lines,
            self.bytes,
            self.open_day,
            Local::now(),
        ) {
            let result = self.rotate(at).await;
            self.report_rotation(&result);
        }

        let line = self.formatter.render(&self.config.format, record);
        let result = self.write_bytes(line.as_bytes()).await;

        self.lines += 1;
        if result.is_ok() {
            self.bytes += line.len() as u64;
        }

        self.write_failures
            .report(&self.errors, &self.config.path, result.as_ref().map(|_| ()));
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        file.write_all(bytes)
            .await
            .map_err(|e| Error::Io("error writing log file", e))?;
        file.flush()
            .await
            .map_err(|e| Error::Io("error flushing log file", e))
    }

    fn report_rotation(&mut self, result: &Result<()>) {
        self.rotation_failures
            .report(&self.errors, &self.config.path, result.as_ref().map(|_| ()));
    }

    /// Retire the active file under a name derived from `at`, then reopen
    /// the active path.
    ///
    /// The active path is reopened even if the rename failed, so logging
    /// continues in the old file.
    async fn rotate(&mut self, at: DateTime<Local>) -> Result<()> {
        let mut retired = Ok(());

        if self.config.rotation.keep_rotated && fs::symlink_metadata(&self.config.path).await.is_ok()
        {
            let target =
                next_rotated_name(&self.config.path, self.config.rotation.suffix, at).await?;

            self.close_active().await;

            match fs::rename(&self.config.path, &target).await {
                Ok(()) => {
                    tracing::debug!(
                        "rotated {} to {}",
                        self.config.path.display(),
                        target.display()
                    );
                    self.retire(target).await;
                }
                Err(source) => {
                    retired = Err(Error::Rename {
                        from: self.config.path.clone(),
                        to: target,
                        source,
                    });
                }
            }
        }

        let reopened = self.open_active().await;
        retired.and(reopened)
    }

    /// Hand a rotated file to the background worker. The queue holds one
    /// file, so this waits while the worker is still busy with the last one.
    async fn retire(&self, path: PathBuf) {
        let policy = self.config.archive_policy();
        if !policy.is_active() {
            return;
        }

        if let Err(flume::SendError(retired)) =
            self.tasks.send_async(RetiredFile { path, policy }).await
        {
            tracing::warn!(
                "background worker gone, leaving {} as is",
                retired.path.display()
            );
        }
    }

    /// Open the active path for appending and make it the current file.
    ///
    /// The previous handle is only closed once the new one is open, so a
    /// failed reopen leaves logging where it was.
    async fn open_active(&mut self) -> Result<()> {
        make_directory(&self.config.path).await?;
        let file = open_append(&self.config.path).await?;

        self.close_active().await;
        self.file = Some(file);

        self.write_header().await;

        self.open_day = Local::now().day();
        self.lines = 0;
        self.bytes = 0;

        Ok(())
    }

    async fn write_header(&mut self) {
        let header = self
            .formatter
            .render(&self.config.header, &Record::marker(Utc::now()));
        if !header.is_empty()
            && let Err(e) = self.write_bytes(header.as_bytes()).await
        {
            self.write_failures
                .report(&self.errors, &self.config.path, Err(&e));
        }
    }

    /// Write the trailer and drop the active handle.
    async fn close_active(&mut self) {
        let Some(mut file) = self.file.take() else {
            return;
        };

        let trailer = self
            .formatter
            .render(&self.config.trailer, &Record::marker(Utc::now()));
        if !trailer.is_empty()
            && let Err(e) = file.write_all(trailer.as_bytes()).await
        {
            tracing::debug!("couldn't write trailer to {}: {e}", self.config.path.display());
        }

        if let Err(e) = file.flush().await {
            tracing::debug!("couldn't flush {}: {e}", self.config.path.display());
        }
    }
}

/// Decide whether the active file must rotate before the next write, and
/// the nominal time of that rotation.
///
/// Size and line limits rotate at `now`. A day change rotates at
/// `now - 24h` so the retiring file carries the day it covered.
pub(crate) fn rotation_due(
    policy: &RotationPolicy,
    lines: u64,
    bytes: u64,
    open_day: u32,
    now: DateTime<Local>,
) -> Option<DateTime<Local>> {
    if (policy.max_bytes > 0 && bytes >= policy.max_bytes)
        || (policy.max_lines > 0 && lines >= policy.max_lines)
    {
        Some(now)
    } else if policy.daily && now.day() != open_day {
        Some(now - TimeDelta::hours(24))
    } else {
        None
    }
}

/// Create the parent directory of `path` and make sure it can be stat'ed.
async fn make_directory(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
    fs::metadata(dir)
        .await
        .map_err(|source| Error::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;

    Ok(())
}

async fn open_append(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    options.mode(0o660);

    options
        .open(path)
        .await
        .map_err(|e| Error::Io("error opening log file", e))
}
