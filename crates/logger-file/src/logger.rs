//! The file logger handle.

use crate::config::FileLoggerConfig;
use crate::error::{Error, Result};
use crate::naming::archive_matcher;
use crate::report::ErrorSink;
use crate::worker;
use crate::writer::{Control, Writer};

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use proven_logger::{Logger, Record};
use tokio::fs;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Logger writing formatted records to a rotating file.
///
/// Records are queued to a writer task that owns the active file. Rotated
/// files are handed to a background worker for age-off and compression.
/// Call [`FileLogger::close`] to drain the queue and wait for both tasks.
pub struct FileLogger {
    path: PathBuf,
    records: flume::Sender<Record>,
    control: flume::Sender<Control>,
    writer: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl FileLogger {
    /// Open the active file and start the writer and worker tasks. Failures
    /// after startup are reported to stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the active file
    /// can't be opened. No task is started in that case.
    pub async fn new(config: FileLoggerConfig) -> Result<Self> {
        Self::with_error_sink(config, ErrorSink::stderr()).await
    }

    /// Like [`FileLogger::new`], reporting failures to `errors`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the active file
    /// can't be opened.
    pub async fn with_error_sink(config: FileLoggerConfig, errors: ErrorSink) -> Result<Self> {
        config.validate()?;

        let base_name = config
            .file_name()
            .ok_or_else(|| Error::Configuration("log path has no file name".to_string()))?;
        let matcher = archive_matcher(base_name)?;

        // Taken before opening, which would otherwise create the file or
        // touch its modification time.
        let existing_modified = fs::symlink_metadata(&config.path)
            .await
            .ok()
            .map(|metadata| metadata.modified().unwrap_or_else(|_| SystemTime::now()));

        let (tasks_tx, tasks_rx) = flume::bounded(1);
        let writer = Writer::open(config.clone(), existing_modified, tasks_tx, errors.clone()).await?;

        let (records_tx, records_rx) = flume::bounded(config.queue_depth);
        let (control_tx, control_rx) = flume::bounded(0);

        let worker = tokio::spawn(worker::run(tasks_rx, matcher, config.path.clone(), errors));
        let writer = tokio::spawn(writer.run(records_rx, control_rx));

        tracing::debug!("file logger started for {}", config.path.display());

        Ok(Self {
            path: config.path,
            records: records_tx,
            control: control_tx,
            writer,
            worker,
        })
    }

    /// Path of the active file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a record, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the writer has stopped.
    pub async fn write(&self, record: Record) -> Result<()> {
        self.records
            .send_async(record)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Rotate the active file now and wait until it has been reopened.
    ///
    /// Rotation failures go to the error sink, not the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the writer has stopped.
    pub async fn rotate(&self) -> Result<()> {
        self.request_rotation(None).await
    }

    /// Rotate the active file as if it were `at`, which picks the date suffix
    /// of the retired file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the writer has stopped.
    pub async fn rotate_at(&self, at: DateTime<Local>) -> Result<()> {
        self.request_rotation(Some(at)).await
    }

    async fn request_rotation(&self, at: Option<DateTime<Local>>) -> Result<()> {
        let (done, acked) = oneshot::channel();
        self.control
            .send_async(Control::Rotate { at, done })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        acked.await.map_err(|_| Error::ChannelClosed)
    }

    /// Replace the configuration before any record has been written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationFrozen`] once a record was processed,
    /// [`Error::Configuration`] if `config` names another path or is
    /// invalid, and [`Error::ChannelClosed`] if the writer has stopped.
    pub async fn reconfigure(&self, config: FileLoggerConfig) -> Result<()> {
        let (done, acked) = oneshot::channel();
        self.control
            .send_async(Control::Reconfigure {
                config: Box::new(config),
                done,
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        acked.await.map_err(|_| Error::ChannelClosed)?
    }

    /// Drain queued records, close the active file and wait for the
    /// background worker to finish the last retired file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Join`] if either task panicked.
    pub async fn close(self) -> Result<()> {
        let Self {
            path,
            records,
            control,
            writer,
            worker,
        } = self;

        drop(records);
        drop(control);

        writer.await?;
        worker.await?;

        tracing::debug!("file logger for {} closed", path.display());
        Ok(())
    }
}

impl std::fmt::Debug for FileLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogger")
            .field("path", &self.path)
            .field("queued", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl Logger for FileLogger {
    /// Blocks the calling thread while the queue is full; async callers
    /// should prefer [`FileLogger::write`].
    fn log(&self, record: Record) {
        if self.records.send(record).is_err() {
            tracing::debug!("file logger for {} is closed", self.path.display());
        }
    }

    /// Every record is flushed as it is written.
    fn flush(&self) {}
}
