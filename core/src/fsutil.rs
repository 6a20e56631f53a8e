//! Filesystem helpers: atomic writes and advisory file locks.
//!
//! Anchor files, the main pf configuration and the schedule log are shared
//! between concurrent invocations, so every mutation is written to a unique
//! temporary file next to its target and renamed into place, and every
//! read-modify-write cycle runs under an exclusive lock.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Write `contents` to `path` atomically.
///
/// Readers observe either the old file or the complete new one. On failure
/// the temporary file is discarded and `path` is left untouched.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("Not a file path: {}", path.display())))?;

    let temp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result = write_and_rename(&temp_path, path, contents).await;
    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}

async fn write_and_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|e| Error::from_io(e, temp_path))?;

    file.write_all(contents)
        .await
        .map_err(|e| Error::from_io(e, temp_path))?;

    file.sync_all()
        .await
        .map_err(|e| Error::from_io(e, temp_path))?;

    fs::rename(temp_path, path)
        .await
        .map_err(|e| Error::from_io(e, path))?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Make sure `path` is a directory.
///
/// A non-directory artifact at `path` is removed and replaced.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            tracing::warn!("Replacing non-directory {} with a directory", path.display());
            fs::remove_file(path)
                .await
                .map_err(|e| Error::from_io(e, path))?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::from_io(e, path)),
    }

    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::from_io(e, path))
}

/// Remove a file, treating "already gone" as success.
///
/// Returns whether a file was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::from_io(e, path)),
    }
}

/// Read a file, returning `None` when it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::from_io(e, path)),
    }
}

/// List `*.conf` entries of a directory as file stems, sorted.
///
/// Hidden files (temporaries, lock files) are skipped. A missing directory
/// lists as empty.
pub async fn list_conf_files(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::from_io(e, dir)),
    };

    let mut stems = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::from_io(e, dir))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if let Some(stem) = name.strip_suffix(".conf") {
            stems.push(stem.to_string());
        }
    }

    stems.sort();
    Ok(stems)
}

/// An exclusive advisory lock held for as long as the value lives.
pub struct FileLock {
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<std::fs::File>,
    #[cfg(not(unix))]
    _file: std::fs::File,
    path: PathBuf,
}

impl FileLock {
    /// Block (on a worker thread) until an exclusive lock on `path` is held.
    ///
    /// The lock file is created if missing and is never removed.
    pub async fn acquire(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::acquire_blocking(path))
            .await
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    fn acquire_blocking(path: PathBuf) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::from_io(e, &path))?;

        #[cfg(unix)]
        {
            use nix::fcntl::{Flock, FlockArg};

            let lock = Flock::lock(file, FlockArg::LockExclusive)
                .map_err(|(_, errno)| Error::from_io(std::io::Error::from(errno), &path))?;
            tracing::debug!("Locked {}", path.display());
            Ok(Self { _lock: lock, path })
        }

        #[cfg(not(unix))]
        {
            Ok(Self { _file: file, path })
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        tracing::debug!("Unlocked {}", self.path.display());
    }
}
