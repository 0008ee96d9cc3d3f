//! Age-off of rotated files beyond the retention count.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::fs;

/// Delete the oldest rotated files in `dir` so that at most `retain` remain.
///
/// Entries are streamed from the directory, so only matching names are held
/// in memory. Date suffixes are fixed width, which makes lexicographic order
/// chronological. Individual deletions are best-effort. Returns the paths
/// that were deleted.
///
/// # Errors
///
/// Returns an error if `dir` is not a readable directory.
pub async fn archive(dir: &Path, matcher: &Regex, retain: usize) -> Result<Vec<PathBuf>> {
    if retain == 0 {
        return Ok(Vec::new());
    }

    let metadata = fs::metadata(dir)
        .await
        .map_err(|e| Error::Io("error reading log directory", e))?;
    if !metadata.is_dir() {
        return Err(Error::Configuration(format!(
            "{} must be a directory",
            dir.display()
        )));
    }

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| Error::Io("error reading log directory", e))?;
    let mut matched = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::Io("error reading log directory entry", e))?
    {
        if let Some(name) = entry.file_name().to_str()
            && matcher.is_match(name)
        {
            matched.push(name.to_string());
        }
    }

    if matched.len() <= retain {
        return Ok(Vec::new());
    }

    matched.sort();
    let excess = matched.len() - retain;
    let mut deleted = Vec::with_capacity(excess);

    for name in matched.into_iter().take(excess) {
        let path = dir.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("aged off {}", path.display());
                deleted.push(path);
            }
            Err(e) => tracing::debug!("couldn't age off {}: {e}", path.display()),
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::archive_matcher;

    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), name).unwrap();
    }

    fn remaining(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_keeps_most_recent() {
        let dir = tempdir().unwrap();
        let matcher = archive_matcher("app.log").unwrap();

        touch(dir.path(), "app.log");
        touch(dir.path(), "app.log.2024-01-01.gz");
        touch(dir.path(), "app.log.2024-01-02");
        touch(dir.path(), "app.log.2024-01-02.0001");
        touch(dir.path(), "app.log.2024-01-03.zip");
        touch(dir.path(), "other.log.2023-01-01");

        let deleted = archive(dir.path(), &matcher, 2).await.unwrap();

        assert_eq!(deleted.len(), 2);
        assert_eq!(
            remaining(dir.path()),
            vec![
                "app.log",
                "app.log.2024-01-02.0001",
                "app.log.2024-01-03.zip",
                "other.log.2023-01-01",
            ]
        );
    }

    #[tokio::test]
    async fn test_fewer_than_retain_untouched() {
        let dir = tempdir().unwrap();
        let matcher = archive_matcher("app.log").unwrap();

        touch(dir.path(), "app.log.2024-01-01");
        touch(dir.path(), "app.log.2024-01-02");

        let deleted = archive(dir.path(), &matcher, 5).await.unwrap();

        assert!(deleted.is_empty());
        assert_eq!(remaining(dir.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_zero_retain_disables_archival() {
        let dir = tempdir().unwrap();
        let matcher = archive_matcher("app.log").unwrap();

        for day in 1..=9 {
            touch(dir.path(), &format!("app.log.2024-01-0{day}"));
        }

        let deleted = archive(dir.path(), &matcher, 0).await.unwrap();

        assert!(deleted.is_empty());
        assert_eq!(remaining(dir.path()).len(), 9);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let matcher = archive_matcher("app.log").unwrap();

        let result = archive(&dir.path().join("missing"), &matcher, 3).await;
        assert!(result.is_err());
    }
}
