//! Configuration for the file logger

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

use proven_logger::FORMAT_DEFAULT;
use serde::{Deserialize, Serialize};

/// Default depth of the record queue between callers and the writer.
pub const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Default number of rotated files kept on disk.
pub const DEFAULT_RETAIN: usize = 30;

/// How rotated files are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixStrategy {
    /// `<path>.001` through `<path>.999`
    #[default]
    Integer,
    /// `<path>.YYYY-MM-DD`, then `<path>.YYYY-MM-DD.0001` on collision
    Date,
}

/// Codec used to compress rotated files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionMethod {
    /// Single gzip stream, `.gz`
    #[default]
    #[serde(rename = "gz")]
    Gzip,
    /// Zip container holding one entry, `.zip`
    #[serde(rename = "zip")]
    Zip,
}

impl CompressionMethod {
    /// File extension appended to the rotated name, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zip => "zip",
        }
    }
}

/// When and how the active file is rotated and aged off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Keep old files by renaming them; when false, rotation just reopens
    /// the active path
    pub keep_rotated: bool,
    /// Naming scheme for rotated files
    pub suffix: SuffixStrategy,
    /// Rotate once this many lines were written (0 disables)
    pub max_lines: u64,
    /// Rotate once this many bytes were written (0 disables)
    pub max_bytes: u64,
    /// Rotate when the local calendar day changes
    pub daily: bool,
    /// Always rotate a pre-existing active file on startup, not only when it
    /// is from an earlier day
    pub rotate_on_startup: bool,
    /// Number of rotated files kept (0 keeps everything)
    pub retain: usize,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            keep_rotated: true,
            suffix: SuffixStrategy::Integer,
            max_lines: 0,
            max_bytes: 0,
            daily: false,
            rotate_on_startup: true,
            retain: DEFAULT_RETAIN,
        }
    }
}

/// Settings the background worker needs for one retired file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArchivePolicy {
    pub(crate) retain: usize,
    pub(crate) compression: Option<CompressionMethod>,
}

impl ArchivePolicy {
    pub(crate) const fn is_active(self) -> bool {
        self.retain > 0 || self.compression.is_some()
    }
}

/// File logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLoggerConfig {
    /// Path of the active log file
    pub path: PathBuf,
    /// Rotation and retention policy
    #[serde(default)]
    pub rotation: RotationPolicy,
    /// Compression applied to rotated files
    #[serde(default)]
    pub compression: Option<CompressionMethod>,
    /// Template written when a file is opened
    #[serde(default)]
    pub header: String,
    /// Template written when a file is closed
    #[serde(default)]
    pub trailer: String,
    /// Template for each record
    #[serde(default = "default_format")]
    pub format: String,
    /// Capacity of the record queue; 0 hands each record directly to the
    /// writer
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_format() -> String {
    FORMAT_DEFAULT.to_string()
}

const fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

impl FileLoggerConfig {
    /// Configuration with defaults, keeping rotated files when `keep_rotated`
    /// and gzip-compressing them when `compress`.
    pub fn new(path: impl Into<PathBuf>, keep_rotated: bool, compress: bool) -> Self {
        Self {
            path: path.into(),
            rotation: RotationPolicy {
                keep_rotated,
                ..RotationPolicy::default()
            },
            compression: compress.then_some(CompressionMethod::Gzip),
            header: String::new(),
            trailer: String::new(),
            format: default_format(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }

    /// Configuration writing one XML `<record>` element per log entry inside
    /// a `<log>` document.
    pub fn xml(path: impl Into<PathBuf>, keep_rotated: bool) -> Self {
        Self {
            header: "<log created=\"%D %T\">".to_string(),
            trailer: "</log>".to_string(),
            format: "\t<record level=\"%L\">\n\
                     \t\t<timestamp>%D %T</timestamp>\n\
                     \t\t<source>%S</source>\n\
                     \t\t<message>%M</message>\n\
                     \t</record>"
                .to_string(),
            ..Self::new(path, keep_rotated, false)
        }
    }

    /// Start building a configuration for `path`.
    pub fn builder(path: impl Into<PathBuf>) -> FileLoggerConfigBuilder {
        FileLoggerConfigBuilder {
            config: Self::new(path, true, false),
        }
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the path has no file name.
    pub fn validate(&self) -> Result<()> {
        if self.file_name().is_none() {
            return Err(Error::Configuration(format!(
                "log path {} has no file name",
                self.path.display()
            )));
        }

        Ok(())
    }

    /// Base name of the active file.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Directory holding the active file and its rotated copies.
    #[must_use]
    pub fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub(crate) const fn archive_policy(&self) -> ArchivePolicy {
        ArchivePolicy {
            retain: self.rotation.retain,
            compression: self.compression,
        }
    }
}

/// Fluent builder for [`FileLoggerConfig`].
#[derive(Debug, Clone)]
pub struct FileLoggerConfigBuilder {
    config: FileLoggerConfig,
}

impl FileLoggerConfigBuilder {
    /// Keep rotated files (true) or simply reopen the active file (false)
    #[must_use]
    pub const fn keep_rotated(mut self, keep: bool) -> Self {
        self.config.rotation.keep_rotated = keep;
        self
    }

    /// Rotate after this many lines (0 disables)
    #[must_use]
    pub const fn max_lines(mut self, lines: u64) -> Self {
        self.config.rotation.max_lines = lines;
        self
    }

    /// Rotate after this many bytes (0 disables)
    #[must_use]
    pub const fn max_bytes(mut self, bytes: u64) -> Self {
        self.config.rotation.max_bytes = bytes;
        self
    }

    /// Rotate when the local day changes
    #[must_use]
    pub const fn daily(mut self, daily: bool) -> Self {
        self.config.rotation.daily = daily;
        self
    }

    /// Naming scheme for rotated files
    #[must_use]
    pub const fn suffix(mut self, suffix: SuffixStrategy) -> Self {
        self.config.rotation.suffix = suffix;
        self
    }

    /// Rotate a pre-existing active file on every startup
    #[must_use]
    pub const fn rotate_on_startup(mut self, rotate: bool) -> Self {
        self.config.rotation.rotate_on_startup = rotate;
        self
    }

    /// Number of rotated files to keep (0 keeps all)
    #[must_use]
    pub const fn retain(mut self, files: usize) -> Self {
        self.config.rotation.retain = files;
        self
    }

    /// Compress rotated files with `method`, or not at all with `None`
    #[must_use]
    pub const fn compression(mut self, method: Option<CompressionMethod>) -> Self {
        self.config.compression = method;
        self
    }

    /// Header and trailer templates
    #[must_use]
    pub fn head_foot(mut self, header: impl Into<String>, trailer: impl Into<String>) -> Self {
        self.config.header = header.into();
        self.config.trailer = trailer.into();
        self
    }

    /// Line template for records
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.config.format = format.into();
        self
    }

    /// Capacity of the record queue
    #[must_use]
    pub const fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = depth;
        self
    }

    /// Validate and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the path has no file name.
    pub fn build(self) -> Result<FileLoggerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
