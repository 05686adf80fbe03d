//! In-memory [`FileSystem`] for tests.

use super::{parent, DirEntry, EntryType, FileSystem, WriteMode};
use std::collections::BTreeMap;
use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// Filesystem held entirely in memory.
///
/// Behaves like a POSIX directory tree for the operations the store uses:
/// parents must exist before files are written into them, `CreateNew`
/// refuses existing files, and renaming a file replaces the target.
///
/// Writes to selected paths can be made to fail, to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<String, Node>,
    failing_suffixes: Vec<String>,
}

fn other(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message.to_string())
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path:?} not found"))
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write, append or rename onto a path ending in `suffix` fail.
    pub fn fail_writes_to(mut self, suffix: impl Into<String>) -> Self {
        self.failing_suffixes.push(suffix.into());
        self
    }

    /// Paths of every file, sorted.
    pub fn files(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_injected(&self, path: &str) -> io::Result<()> {
        if self.failing_suffixes.iter().any(|s| path.ends_with(s.as_str())) {
            return Err(other("injected write failure"));
        }
        Ok(())
    }

    fn require_dir(&self, path: &str) -> io::Result<()> {
        if path.is_empty() {
            return Ok(());
        }
        match self.nodes.get(path) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(other("not a directory")),
            None => Err(not_found(path)),
        }
    }

    fn descendants(&self, dir: &str) -> Vec<String> {
        let prefix = format!("{}/", dir);
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        match self.nodes.get(path) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            Some(Node::Dir) => Err(other("is a directory")),
            None => Err(not_found(path)),
        }
    }

    fn write(&mut self, path: &str, contents: &[u8], mode: WriteMode) -> io::Result<()> {
        self.check_injected(path)?;
        self.require_dir(parent(path))?;
        match (self.nodes.get(path), mode) {
            (Some(Node::Dir), _) => return Err(other("is a directory")),
            (Some(Node::File(_)), WriteMode::CreateNew) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{path:?} already exists"),
                ))
            }
            _ => {}
        }
        self.nodes
            .insert(path.to_string(), Node::File(contents.to_vec()));
        Ok(())
    }

    fn append(&mut self, path: &str, contents: &[u8]) -> io::Result<()> {
        self.check_injected(path)?;
        self.require_dir(parent(path))?;
        match self
            .nodes
            .entry(path.to_string())
            .or_insert_with(|| Node::File(Vec::new()))
        {
            Node::File(existing) => {
                existing.extend_from_slice(contents);
                Ok(())
            }
            Node::Dir => Err(other("is a directory")),
        }
    }

    fn entry_type(&self, path: &str) -> io::Result<EntryType> {
        if path.is_empty() {
            return Ok(EntryType::Dir);
        }
        match self.nodes.get(path) {
            Some(Node::File(_)) => Ok(EntryType::File),
            Some(Node::Dir) => Ok(EntryType::Dir),
            None => Err(not_found(path)),
        }
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntry>> {
        self.require_dir(path)?;
        let children: Vec<String> = if path.is_empty() {
            self.nodes.keys().cloned().collect()
        } else {
            self.descendants(path)
        };
        let skip = if path.is_empty() { 0 } else { path.len() + 1 };
        Ok(children
            .iter()
            .map(|child| &child[skip..])
            .filter(|name| !name.contains('/'))
            .map(|name| {
                let full = super::join(path, name);
                DirEntry {
                    name: name.to_string(),
                    entry_type: match self.nodes.get(&full) {
                        Some(Node::Dir) => EntryType::Dir,
                        _ => EntryType::File,
                    },
                }
            })
            .collect())
    }

    fn create_dir_all(&mut self, path: &str) -> io::Result<()> {
        if path.is_empty() {
            return Ok(());
        }
        let mut current = String::new();
        for segment in path.split('/') {
            current = super::join(&current, segment);
            match self.nodes.get(&current) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => return Err(other("not a directory")),
                None => {
                    self.nodes.insert(current.clone(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        self.check_injected(to)?;
        self.require_dir(parent(to))?;
        match self.nodes.get(from).cloned() {
            None => Err(not_found(from)),
            Some(Node::File(contents)) => {
                if self.nodes.get(to) == Some(&Node::Dir) {
                    return Err(other("is a directory"));
                }
                self.nodes.remove(from);
                self.nodes.insert(to.to_string(), Node::File(contents));
                Ok(())
            }
            Some(Node::Dir) => {
                if self.nodes.contains_key(to) {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{to:?} already exists"),
                    ));
                }
                if to.starts_with(&format!("{}/", from)) {
                    return Err(other("cannot move a directory into itself"));
                }
                for path in self.descendants(from) {
                    if let Some(node) = self.nodes.remove(&path) {
                        let moved = format!("{}{}", to, &path[from.len()..]);
                        self.nodes.insert(moved, node);
                    }
                }
                self.nodes.remove(from);
                self.nodes.insert(to.to_string(), Node::Dir);
                Ok(())
            }
        }
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        match self.nodes.get(path) {
            Some(Node::File(_)) => {
                self.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir) => Err(other("is a directory")),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir_all(&mut self, path: &str) -> io::Result<()> {
        match self.nodes.get(path) {
            Some(Node::Dir) => {
                for descendant in self.descendants(path) {
                    self.nodes.remove(&descendant);
                }
                self.nodes.remove(path);
                Ok(())
            }
            Some(Node::File(_)) => Err(other("not a directory")),
            None => Err(not_found(path)),
        }
    }
}
