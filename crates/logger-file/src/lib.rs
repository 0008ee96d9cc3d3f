//! File-based logger with rotation, retention and compression
//!
//! This crate provides a file sink for [`proven_logger`] records that supports:
//! - A single writer task per file fed through a bounded queue
//! - Rotation by line count, byte size, day change or on demand
//! - Integer (`app.log.001`) or date (`app.log.2024-03-01`) suffixes
//! - Age-off of old rotated files and gzip or zip compression, off the write path
//! - Throttled failure reporting that never takes the caller down

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

mod archive;
mod compress;
mod config;
mod error;
mod logger;
mod naming;
mod report;
mod worker;
mod writer;

pub use archive::archive;
pub use compress::{INPROGRESS_EXTENSION, compress};
pub use config::{
    CompressionMethod, DEFAULT_QUEUE_DEPTH, DEFAULT_RETAIN, FileLoggerConfig,
    FileLoggerConfigBuilder, RotationPolicy, SuffixStrategy,
};
pub use error::{Error, Result};
pub use logger::FileLogger;
pub use naming::{SUFFIX_DATE_FORMAT, archive_matcher, next_rotated_name};
pub use report::{ErrorSink, FailureKind, FailureTracker};
