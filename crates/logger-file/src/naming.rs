//! Names of rotated files and the matcher that recognizes them.

use crate::config::{CompressionMethod, SuffixStrategy};
use crate::error::{Error, Result};

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use regex::Regex;
use tokio::fs;

/// Rotation suffix accepted by the archive matcher, anchored at the end.
const ARCHIVE_SUFFIX_PATTERN: &str = r"\.[0-9]{4}-[0-9]{2}-[0-9]{2}(\.[0-9]{4})?(\.gz|\.zip)?$";

/// Date format of date-suffixed rotated files.
pub const SUFFIX_DATE_FORMAT: &str = "%Y-%m-%d";

const MAX_INTEGER_SUFFIX: u32 = 999;
const MAX_DATE_COLLISION_SUFFIX: u32 = 9999;

/// Build the matcher for rotated copies of the file named `base_name`.
///
/// # Errors
///
/// Returns [`Error::InvalidMatcher`] if the pattern fails to compile.
pub fn archive_matcher(base_name: &str) -> Result<Regex> {
    let pattern = format!("^{}{ARCHIVE_SUFFIX_PATTERN}", regex::escape(base_name));
    Ok(Regex::new(&pattern)?)
}

/// `path` with `.suffix` appended to its file name.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Pick the destination for rotating `path` at `at`.
///
/// # Errors
///
/// Returns [`Error::RotationExhausted`] if every candidate is taken.
pub async fn next_rotated_name(
    path: &Path,
    strategy: SuffixStrategy,
    at: DateTime<Local>,
) -> Result<PathBuf> {
    match strategy {
        SuffixStrategy::Integer => next_integer_name(path).await,
        SuffixStrategy::Date => {
            next_date_name(path, &at.format(SUFFIX_DATE_FORMAT).to_string()).await
        }
    }
}

async fn next_integer_name(path: &Path) -> Result<PathBuf> {
    for i in 1..=MAX_INTEGER_SUFFIX {
        let candidate = with_suffix(path, &format!("{i:03}"));
        if is_free(&candidate).await {
            return Ok(candidate);
        }
    }

    Err(Error::RotationExhausted {
        path: path.to_path_buf(),
    })
}

async fn next_date_name(path: &Path, date: &str) -> Result<PathBuf> {
    let candidate = with_suffix(path, date);
    if is_free(&candidate).await {
        return Ok(candidate);
    }

    for i in 1..=MAX_DATE_COLLISION_SUFFIX {
        let candidate = with_suffix(path, &format!("{date}.{i:04}"));
        if is_free(&candidate).await {
            return Ok(candidate);
        }
    }

    Err(Error::RotationExhausted {
        path: path.to_path_buf(),
    })
}

/// A name is free only when neither it nor a compressed copy of it exists.
async fn is_free(path: &Path) -> bool {
    if !is_absent(path).await {
        return false;
    }
    for method in [CompressionMethod::Gzip, CompressionMethod::Zip] {
        if !is_absent(&with_suffix(path, method.extension())).await {
            return false;
        }
    }
    true
}

/// Only `NotFound` counts as absent; any other lookup error means taken.
async fn is_absent(path: &Path) -> bool {
    matches!(fs::symlink_metadata(path).await, Err(e) if e.kind() == io::ErrorKind::NotFound)
}
