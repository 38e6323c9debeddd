//! Store directory management.
//!
//! A file-backed store lives in its own directory:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK          # Advisory lock held while the store is open
//! └─ records.log   # Frame log
//! ```
//!
//! The LOCK file guarantees a single open handle per directory.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "records.log";

/// An opened, exclusively locked store directory.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if the directory is missing and
    ///   `create_if_missing` is false
    /// - [`StorageError::Locked`] if another handle holds the lock
    /// - [`StorageError::Io`] on file system failures
    pub fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StorageError::NotFound(path.display().to_string()));
            }
        }

        if !path.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a directory: {}", path.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(path.display().to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the frame log.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    /// Removes a closed store directory and everything in it.
    ///
    /// Missing directories are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if the store is still open, or an
    /// I/O error if removal fails.
    pub fn destroy(path: &Path) -> StorageResult<()> {
        if !path.exists() {
            return Ok(());
        }

        // Taking the lock proves no handle is still using the files.
        drop(Self::open(path, false)?);
        fs::remove_dir_all(path)?;
        Ok(())
    }
}
