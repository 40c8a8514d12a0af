//! Crash-safe file persistence for session state.
//!
//! Writes go to a temp file in the destination directory, then rename over the
//! target, so a reader sees either the old document or the new one and never a
//! torn mix. On Windows, rename-over-existing fails, so the previous document
//! is parked at `<path>.bak` for the second rename; [`recover_backup`] puts it
//! back if that rename never happened.

#[cfg(unix)]
use std::fs::File;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

/// Session files are readable by their owner only.
#[cfg(unix)]
const OWNER_ONLY_MODE: u32 = 0o600;

#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("bak")
}

/// Write `bytes` to `path` atomically with owner-only permissions.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(OWNER_ONLY_MODE))?;
    }

    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        let backup = backup_path(path);
        let _ = fs::remove_file(&backup);
        fs::rename(path, &backup)?;

        if let Err(rename_err) = err.file.persist(path) {
            let _ = fs::rename(&backup, path);
            return Err(rename_err.error);
        }
        if let Err(e) = fs::remove_file(&backup) {
            tracing::warn!(
                path = %backup.display(),
                "Failed to remove .bak after atomic write: {e}"
            );
        }
    }

    best_effort_sync_parent_dir(parent);
    Ok(())
}

/// Restore `<path>.bak` left by a write interrupted between its two renames.
///
/// Returns whether a backup was moved into place. Does nothing while `path`
/// exists.
pub fn recover_backup(path: impl AsRef<Path>) -> io::Result<bool> {
    let path = path.as_ref();
    let backup = backup_path(path);
    if path.exists() || !backup.exists() {
        return Ok(false);
    }
    fs::rename(&backup, path)?;
    tracing::warn!(
        path = %path.display(),
        "Recovered .bak file from interrupted atomic write"
    );
    Ok(true)
}

/// Remove a file, treating "already gone" as success.
///
/// A single unlink, so concurrent readers observe the file either present or
/// absent.
pub fn remove_if_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn best_effort_sync_parent_dir(parent: &Path) {
    if let Err(e) = File::open(parent).and_then(|d| d.sync_all()) {
        debug!(path = %parent.display(), "Parent directory sync_all failed (best-effort): {e}");
    }
}

#[cfg(not(unix))]
fn best_effort_sync_parent_dir(parent: &Path) {
    debug!(path = %parent.display(), "Parent directory sync skipped on this platform");
}
