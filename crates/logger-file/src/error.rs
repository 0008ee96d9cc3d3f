//! Error types for file-based logging

use std::io;
use std::path::PathBuf;

/// Result type for file logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during file logging
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed
    #[error("{0}: {1}")]
    Io(&'static str, #[source] io::Error),

    /// Failed to create or stat the log directory
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// The archive matcher could not be compiled
    #[error("Invalid archive matcher: {0}")]
    InvalidMatcher(#[from] regex::Error),

    /// Every candidate name for a rotated file is taken
    #[error("Cannot find a free rotated filename for {path}")]
    RotationExhausted {
        /// The active file being rotated
        path: PathBuf,
    },

    /// Renaming the active file out of the way failed
    #[error("Failed to rename {from} to {to}: {source}")]
    Rename {
        /// The active file
        from: PathBuf,
        /// The rotated destination
        to: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// No active file handle is open
    #[error("Log file is not open")]
    NotOpen,

    /// Compressing a rotated file failed
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration can no longer change
    #[error("Configuration is frozen once the first record has been processed")]
    ConfigurationFrozen,

    /// The writer has shut down
    #[error("Failed to send log message: channel closed")]
    ChannelClosed,

    /// A background task panicked or was aborted
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}
