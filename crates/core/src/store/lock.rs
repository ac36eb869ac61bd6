//! Cross-process lock for snapshot files.
//!
//! [`GraphLock`](super::GraphLock) only serializes callers inside one process.
//! When several processes share one snapshot file, each one holds a
//! [`SnapshotLock`] from the moment it reads the snapshot until it has written
//! it back, so a cycle check and the insert it guards see the same edge set.

use crate::{Error, Result};
use fs4::tokio::AsyncFileExt;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tracing::debug;

/// How a [`SnapshotLock`] is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Any number of readers at once.
    Shared,
    /// A single writer; excludes readers too.
    Exclusive,
}

/// Advisory lock on the `<snapshot>.lock` file next to a snapshot.
///
/// The lock is released when the value is dropped and the file is closed.
#[derive(Debug)]
pub struct SnapshotLock {
    _file: File,
    path: PathBuf,
    mode: LockMode,
}

impl SnapshotLock {
    /// Path of the lock file guarding `snapshot`.
    #[must_use]
    pub fn path_for(snapshot: &Path) -> PathBuf {
        let mut path = snapshot.as_os_str().to_owned();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Block until the lock guarding `snapshot` is held in `mode`.
    pub async fn acquire(snapshot: impl AsRef<Path>, mode: LockMode) -> Result<Self> {
        let path = Self::path_for(snapshot.as_ref());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(e, parent, "create directory"))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| Error::io(e, &path, "open"))?;

        match mode {
            LockMode::Shared => file.lock_shared(),
            LockMode::Exclusive => file.lock_exclusive(),
        }
        .map_err(|e| Error::io(e, &path, "lock"))?;

        debug!(path = %path.display(), ?mode, "Snapshot lock acquired");
        Ok(Self {
            _file: file,
            path,
            mode,
        })
    }

    /// The mode the lock is held in.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
