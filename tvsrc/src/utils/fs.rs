//! Filesystem helpers shared across modules.
//!
//! These helpers provide consistent error context (operation + path) and keep
//! the rename-into-place logic used for publication in one spot.

use std::path::Path;

use tracing::{debug, warn};

use crate::{Error, Result};

/// Convert an IO error into an application error with operation + path context.
pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// Ensure the parent directory of a file path exists.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| io_error("creating directory", parent, e))
}

/// Ensure a directory exists (synchronous variant).
pub fn ensure_dir_all_sync(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error("creating directory", path, e))
}

/// Atomically move `source` over `target`.
///
/// The source is synced before the rename and, on Unix, the target directory is
/// synced afterwards so the new entry survives a crash. Returns `false` when
/// `source` does not exist.
pub async fn replace_file(source: &Path, target: &Path) -> Result<bool> {
    match tokio::fs::try_exists(source).await {
        Ok(true) => {}
        Ok(false) => return Ok(false),
        Err(e) => return Err(io_error("checking", source, e)),
    }

    let file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(source)
        .await
        .map_err(|e| io_error("opening", source, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_error("syncing", source, e))?;
    drop(file);

    ensure_parent_dir(target).await?;
    tokio::fs::rename(source, target)
        .await
        .map_err(|e| io_error("renaming", source, e))?;

    sync_parent_dir(target).await;
    Ok(true)
}

#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    let result = async {
        let dir = tokio::fs::File::open(&parent).await?;
        dir.sync_all().await
    }
    .await;
    if let Err(e) = result {
        debug!(path = %parent.display(), error = %e, "Failed to sync directory");
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}

/// Remove a file, ignoring a missing file and logging other failures.
pub async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}
