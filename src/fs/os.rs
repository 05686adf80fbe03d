//! [`FileSystem`] backed by a real directory.

use super::{DirEntry, EntryType, FileSystem, WriteMode};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Filesystem rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct OsFileSystem {
    root: PathBuf,
}

impl OsFileSystem {
    /// Uses `root` as the store root. The directory is not created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `root` as the store root, creating it if it does not exist.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            resolved.push(segment);
        }
        resolved
    }
}

impl FileSystem for OsFileSystem {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn write(&mut self, path: &str, contents: &[u8], mode: WriteMode) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true);
        match mode {
            WriteMode::CreateNew => options.create_new(true),
            WriteMode::Truncate => options.create(true).truncate(true),
        };
        let mut file = options.open(self.resolve(path))?;
        file.write_all(contents)?;
        file.flush()
    }

    fn append(&mut self, path: &str, contents: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.resolve(path))?;
        file.write_all(contents)?;
        file.flush()
    }

    fn entry_type(&self, path: &str) -> io::Result<EntryType> {
        let metadata = fs::metadata(self.resolve(path))?;
        Ok(if metadata.is_dir() {
            EntryType::Dir
        } else {
            EntryType::File
        })
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path))? {
            let entry = entry?;
            let entry_type = if entry.file_type()?.is_dir() {
                EntryType::Dir
            } else {
                EntryType::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                entry_type,
            });
        }
        Ok(entries)
    }

    fn create_dir_all(&mut self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path))
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from), self.resolve(to))
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }

    fn remove_dir_all(&mut self, path: &str) -> io::Result<()> {
        fs::remove_dir_all(self.resolve(path))
    }
}
