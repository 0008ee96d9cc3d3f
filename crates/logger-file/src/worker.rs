//! Background worker for rotated files: age-off first, then compression.

use crate::archive::archive;
use crate::compress::compress;
use crate::config::ArchivePolicy;
use crate::report::ErrorSink;

use std::path::{Path, PathBuf};

use regex::Regex;

/// A file that was just renamed out of the active slot.
#[derive(Debug)]
pub(crate) struct RetiredFile {
    pub(crate) path: PathBuf,
    pub(crate) policy: ArchivePolicy,
}

/// Drain retired files until every sender is gone.
pub(crate) async fn run(
    tasks: flume::Receiver<RetiredFile>,
    matcher: Regex,
    active: PathBuf,
    errors: ErrorSink,
) {
    while let Ok(retired) = tasks.recv_async().await {
        process(&retired, &matcher, &active, &errors).await;
    }

    tracing::debug!("background worker for {} stopped", active.display());
}

async fn process(retired: &RetiredFile, matcher: &Regex, active: &Path, errors: &ErrorSink) {
    let dir = match retired.path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if retired.policy.retain > 0
        && let Err(e) = archive(dir, matcher, retired.policy.retain).await
    {
        errors.emit_best_effort(format_args!(
            "FileLogger({active:?}): Couldn't archive files: {e}"
        ));
    }

    // Compression runs even if age-off just removed the file; the open then
    // fails and the failure is reported like any other.
    if let Some(method) = retired.policy.compression
        && let Err(e) = compress(&retired.path, method).await
    {
        errors.emit_best_effort(format_args!(
            "FileLogger({active:?}): Couldn't compress {:?}: {e}",
            retired.path
        ));
    }
}
