//! Byte-range I/O adapter
//!
//! Thin wrappers over the filesystem: read a whole file, replace a whole file,
//! append to a file. A live database appends through the [`ByteStore`] seam so
//! the engine can run against a real file ([`FileStore`]) or an in-process
//! buffer ([`MemoryStore`]).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::errors::{StorageError, StorageResult};

/// Append-only byte storage backing a live database handle.
pub trait ByteStore: Send + std::fmt::Debug {
    /// Reads every byte currently stored.
    fn read_all(&mut self) -> StorageResult<Vec<u8>>;

    /// Appends bytes at the end of the store.
    fn append(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Makes previously appended bytes durable.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store back to `len` bytes. Only used to undo a failed append.
    fn truncate(&mut self, len: u64) -> StorageResult<()>;

    /// Human-readable location for logs and errors.
    fn location(&self) -> String;
}

/// A [`ByteStore`] over a file on disk.
///
/// Reads and appends go through [`read_whole_file`] and [`append_to_file`];
/// the open handle is kept for fsync and truncation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: File,
}

impl FileStore {
    /// Opens `path`. With `writable` the file is opened for writing;
    /// with `create` it is created when missing.
    pub fn open(path: &Path, writable: bool, create: bool) -> StorageResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true);
        if writable {
            options.write(true).create(create);
        }

        let file = options.open(path).map_err(|e| {
            StorageError::io_error(format!("Failed to open database file: {}", path.display()), e)
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl ByteStore for FileStore {
    fn read_all(&mut self) -> StorageResult<Vec<u8>> {
        read_whole_file(&self.path)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        append_to_file(&self.path, data)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all().map_err(|e| {
            StorageError::io_error(format!("Failed to sync: {}", self.path.display()), e)
        })
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        self.file
            .set_len(len)
            .and_then(|_| self.file.sync_all())
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to truncate {} to {} bytes", self.path.display(), len),
                    e,
                )
            })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// A [`ByteStore`] kept entirely in memory.
///
/// Clones share the same buffer, so a test can keep one clone to inspect or
/// damage the bytes after the database handle is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Replaces the stored bytes.
    pub fn replace(&self, bytes: Vec<u8>) {
        *self.lock() = bytes;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u8>> {
        // A poisoned buffer is still a plain Vec<u8>; keep using it.
        self.bytes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ByteStore for MemoryStore {
    fn read_all(&mut self) -> StorageResult<Vec<u8>> {
        Ok(self.snapshot())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        self.lock().extend_from_slice(data);
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        self.lock().truncate(len as usize);
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

/// Reads the entire file at `path`.
pub fn read_whole_file(path: &Path) -> StorageResult<Vec<u8>> {
    fs::read(path).map_err(|e| {
        StorageError::io_error(format!("Failed to read file: {}", path.display()), e)
    })
}

/// Replaces the file at `path` with `bytes`.
///
/// The bytes go to a sibling temp file which is fsynced and renamed over the
/// target, so readers see either the old file or the complete new one.
pub fn write_whole_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let tmp_path = temp_sibling(path);

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        fsync_parent(path)
    })();

    result.map_err(|e| {
        // Best effort removal - we're already in an error path
        let _ = fs::remove_file(&tmp_path);
        StorageError::io_error(format!("Failed to write file: {}", path.display()), e)
    })
}

/// Appends `bytes` to the existing file at `path`. Durability is the
/// caller's job (see [`ByteStore::sync`]).
pub fn append_to_file(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(bytes))
        .map_err(|e| {
            StorageError::io_error(format!("Failed to append to file: {}", path.display()), e)
        })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn fsync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn fsync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
