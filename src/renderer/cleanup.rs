//! Fail-open file cleanup
//!
//! Deletions here never return errors: a cleanup failure must not mask the
//! failure (or success) that triggered it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Prefix shared by every ephemeral file
pub const TEMP_PREFIX: &str = "temp_";

/// Remove a file, ignoring absence; returns whether a file was deleted
pub async fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Delete delivered files after `delay`
pub async fn cleanup_files(files: Vec<PathBuf>, delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut removed = 0;
    for path in &files {
        if remove_quietly(path).await {
            removed += 1;
        }
    }
    debug!("Cleaned up {}/{} temp files", removed, files.len());
}

/// Run [`cleanup_files`] in the background
pub fn schedule_cleanup(files: Vec<PathBuf>, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(cleanup_files(files, delay))
}

/// Delete every leftover ephemeral file in `data_dir`
///
/// Meant for shutdown; returns the number of files removed.
pub async fn purge_temp_files(data_dir: &Path) -> usize {
    let mut entries = match fs::read_dir(data_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping temp purge of {}: {}", data_dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_temp = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(TEMP_PREFIX));
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);

        if is_temp && is_file && remove_quietly(&entry.path()).await {
            removed += 1;
        }
    }

    removed
}
