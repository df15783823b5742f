use crate::RemoteError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the lock file created inside a synced directory.
pub const LOCK_FILE_NAME: &str = ".packsync.lock";

/// Exclusive guard over one local pack directory for the duration of a sync.
pub struct SyncLock {
    lock_file: File,
    path: PathBuf,
}

impl SyncLock {
    /// Take the lock for `dir`, failing immediately with
    /// [`RemoteError::SyncInProgress`] if another sync holds it.
    pub fn try_acquire(dir: &Path) -> Result<Self, RemoteError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE_NAME);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: file,
                path,
            }),
            Err(_) => Err(RemoteError::SyncInProgress(dir.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}
