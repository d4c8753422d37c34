use std::{
    ffi::OsString,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::{error::SnapshotError, record::TableRecord};

/// The on-disk copy of the whole table set: one JSON array, replaced in
/// full after every mutation.
///
/// A new snapshot is written to a temporary file next to the old one and
/// renamed over it, so the file always holds either the previous or the
/// new table set, never a partial one.
///
/// Reads and writes take an advisory lock on a sibling `.lock` file, so that
/// two store processes pointed at the same snapshot do not interleave.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Snapshot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn open_lock_file(&self) -> Result<fd_lock::RwLock<File>, SnapshotError> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| SnapshotError::Io {
                path: lock_path,
                source,
            })?;
        Ok(fd_lock::RwLock::new(file))
    }

    /// Read the table set. A missing file is an empty set.
    pub fn load(&self) -> Result<Vec<TableRecord>, SnapshotError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let locking = self.open_lock_file()?;
        let _guard = locking.read().map_err(|e| self.io_error(e))?;

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        let records: Vec<TableRecord> = serde_json::from_reader(io::BufReader::new(file))
            .map_err(|source| SnapshotError::Format {
                path: self.path.clone(),
                source,
            })?;
        Ok(records)
    }

    /// Replace the file contents with `records`.
    pub fn save(&self, records: &[TableRecord]) -> Result<(), SnapshotError> {
        self.replace_with(|writer| {
            serde_json::to_writer(writer, records).map_err(|source| SnapshotError::Format {
                path: self.path.clone(),
                source,
            })
        })
    }

    /// Write a new snapshot with `write` and move it into place. If `write`
    /// fails, the previous snapshot is left as it was.
    fn replace_with(
        &self,
        write: impl FnOnce(&mut dyn Write) -> Result<(), SnapshotError>,
    ) -> Result<(), SnapshotError> {
        let directory = self.directory();
        let mut locking = self.open_lock_file()?;
        let _guard = locking.write().map_err(|e| self.io_error(e))?;

        let mut temp = NamedTempFile::new_in(directory).map_err(|e| self.io_error(e))?;
        {
            let mut writer = io::BufWriter::new(temp.as_file_mut());
            write(&mut writer)?;
            writer.flush().map_err(|e| self.io_error(e))?;
        }
        temp.as_file().sync_all().map_err(|e| self.io_error(e))?;

        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        // make the rename itself durable
        File::open(directory)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
