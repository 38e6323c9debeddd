//! File-based log backend.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Suffix of the scratch file used while replacing the log.
const REPLACE_SUFFIX: &str = "compact";

/// A record log stored in a single file.
///
/// # Durability
///
/// - `append` pushes bytes to the OS
/// - `sync` calls `File::sync_data()`
/// - `replace` writes a scratch file, syncs it, renames it over the log and
///   syncs the parent directory
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileLog {
    /// Opens or creates the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(path: &Path) -> StorageResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl LogBackend for FileLog {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = *self.size.read();
        let mut buffer = Vec::with_capacity(size as usize);

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(0))?;
        Read::by_ref(&mut *file).take(size).read_to_end(&mut buffer)?;

        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();

        let offset = *size;
        if data.is_empty() {
            return Ok(offset);
        }

        file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        *size += data.len() as u64;

        Ok(offset)
    }

    fn sync(&mut self) -> StorageResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();

        if new_size > *size {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot grow log from {} to {} bytes", *size, new_size),
            )));
        }

        file.set_len(new_size)?;
        file.sync_all()?;
        *size = new_size;

        Ok(())
    }

    fn replace(&mut self, contents: &[u8]) -> StorageResult<()> {
        let scratch = self.path.with_extension(REPLACE_SUFFIX);
        {
            let mut tmp = File::create(&scratch)?;
            tmp.write_all(contents)?;
            tmp.sync_all()?;
        }

        let mut file = self.file.write();
        let mut size = self.size.write();

        fs::rename(&scratch, &self.path)?;
        *file = Self::open_file(&self.path)?;
        *size = contents.len() as u64;
        drop(file);

        self.sync_parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_log_created_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");

        let log = FileLog::open(&path).unwrap();
        assert_eq!(log.size().unwrap(), 0);
        assert!(log.read_all().unwrap().is_empty());
        assert!(path.exists());
        assert_eq!(log.path(), path);
    }

    #[test]
    fn file_log_append_offsets() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("records.log")).unwrap();

        assert_eq!(log.append(b"abc").unwrap(), 0);
        assert_eq!(log.append(b"").unwrap(), 3);
        assert_eq!(log.append(b"defg").unwrap(), 3);
        assert_eq!(log.read_all().unwrap(), b"abcdefg");
    }

    #[test]
    fn file_log_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");

        {
            let mut log = FileLog::open(&path).unwrap();
            log.append(b"durable").unwrap();
            log.sync().unwrap();
        }

        let log = FileLog::open(&path).unwrap();
        assert_eq!(log.size().unwrap(), 7);
        assert_eq!(log.read_all().unwrap(), b"durable");
    }

    #[test]
    fn file_log_truncate() {
        let dir = tempdir().unwrap();
        let mut log = FileLog::open(&dir.path().join("records.log")).unwrap();
        log.append(b"hello world").unwrap();

        log.truncate(5).unwrap();
        assert_eq!(log.read_all().unwrap(), b"hello");
        assert!(log.truncate(50).is_err());

        // Appends continue after the cut.
        assert_eq!(log.append(b"!").unwrap(), 5);
    }

    #[test]
    fn file_log_replace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");
        let mut log = FileLog::open(&path).unwrap();
        log.append(b"old old old").unwrap();

        log.replace(b"new").unwrap();
        assert_eq!(log.size().unwrap(), 3);
        assert_eq!(log.read_all().unwrap(), b"new");
        assert!(!path.with_extension(REPLACE_SUFFIX).exists());

        log.append(b"er").unwrap();
        drop(log);

        let log = FileLog::open(&path).unwrap();
        assert_eq!(log.read_all().unwrap(), b"newer");
    }
}
