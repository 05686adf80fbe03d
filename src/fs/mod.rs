//! File-store abstraction.
//!
//! The store never touches `std::fs` directly. It talks to a [`FileSystem`],
//! which addresses entries by `/`-separated paths relative to some root (the
//! empty path is the root itself). [`OsFileSystem`] maps those paths onto a
//! real directory; [`MemoryFileSystem`] keeps everything in memory for tests.
//!
//! Failures are reported as [`std::io::Error`], and implementations must use
//! [`io::ErrorKind::NotFound`] and [`io::ErrorKind::AlreadyExists`] the way
//! the operating system does, since the store relies on them.

pub mod memory;
pub mod os;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use std::io;

/// How [`FileSystem::write`] treats an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `AlreadyExists` if the file exists.
    CreateNew,
    /// Create the file or replace its contents.
    Truncate,
}

/// Type of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    File,
    Dir,
}

/// One entry returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name, without any directory part.
    pub name: String,
    pub entry_type: EntryType,
}

/// Minimal filesystem surface used by the store.
pub trait FileSystem: Send {
    /// Reads a whole file.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Writes a whole file. The parent directory must exist.
    fn write(&mut self, path: &str, contents: &[u8], mode: WriteMode) -> io::Result<()>;

    /// Appends to a file, creating it if needed. The parent directory must exist.
    fn append(&mut self, path: &str, contents: &[u8]) -> io::Result<()>;

    /// Returns the type of the entry at `path`, or `NotFound`.
    fn entry_type(&self, path: &str) -> io::Result<EntryType>;

    /// Lists a directory, in no particular order.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>>;

    /// Creates a directory and all missing parents.
    fn create_dir_all(&mut self, path: &str) -> io::Result<()>;

    /// Moves a file or directory. An existing target file is replaced.
    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;

    /// Removes a file.
    fn remove_file(&mut self, path: &str) -> io::Result<()>;

    /// Removes a directory and everything below it.
    fn remove_dir_all(&mut self, path: &str) -> io::Result<()>;

    /// Returns the entry type, or `None` if nothing exists at `path`.
    fn stat(&self, path: &str) -> io::Result<Option<EntryType>> {
        match self.entry_type(path) {
            Ok(entry_type) => Ok(Some(entry_type)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Returns `true` if a regular file exists at `path`.
    fn is_file(&self, path: &str) -> io::Result<bool> {
        Ok(self.stat(path)? == Some(EntryType::File))
    }

    /// Returns `true` if a directory exists at `path`.
    fn is_dir(&self, path: &str) -> io::Result<bool> {
        Ok(self.stat(path)? == Some(EntryType::Dir))
    }
}

/// Joins a directory path and a name; the empty path is the root.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Returns the directory part of `path`, or `""` for a top-level entry.
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}
