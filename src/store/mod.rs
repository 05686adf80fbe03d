//! Filesystem-backed request store.
//!
//! Each request lives next to its history log:
//!
//! ```text
//! root/
//! ├── users/
//! │   ├── list.request.json
//! │   └── list.history.jsonl
//! └── health.request.json
//! ```
//!
//! Directories are pure namespacing. A request id is the path of its
//! definition file with the `.request.json` suffix removed.
//!
//! All operations, history appends included, run under one store-wide lock
//! for their whole duration. The lock is the [`Mutex`] around the
//! filesystem, so nothing can reach the files without holding it.

mod history;

use crate::codec;
use crate::config::WorkbenchConfig;
use crate::error::{Error, Operation, Result};
use crate::fs::{self, EntryType, FileSystem, OsFileSystem, WriteMode};
use crate::models::{Kind, Request, RequestData, RequestId, Tree};
use crate::registry::{KindInfo, KindRegistry};
use log::{debug, info, warn};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Suffix of request definition files.
pub const REQUEST_SUFFIX: &str = ".request.json";

/// Suffix of history log files.
pub const HISTORY_SUFFIX: &str = ".history.jsonl";

/// Path of the definition file for `id`.
pub fn definition_path(id: &str) -> String {
    format!("{}{}", id, REQUEST_SUFFIX)
}

/// Path of the history log for `id`.
pub fn history_path(id: &str) -> String {
    format!("{}{}", id, HISTORY_SUFFIX)
}

/// What an existing id names on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Request,
    Dir,
}

/// The request store.
///
/// `F` is the filesystem the store owns; use [`Store::open`] for a store on
/// disk and [`crate::fs::MemoryFileSystem`] in tests.
#[derive(Debug)]
pub struct Store<F: FileSystem> {
    fs: Mutex<F>,
    registry: Arc<KindRegistry>,
    pretty: bool,
}

impl Store<OsFileSystem> {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the root cannot be created, or
    /// [`Error::NotFound`] if it does not exist and creation is disabled.
    pub fn open(config: &WorkbenchConfig) -> Result<Self> {
        let root = config.store_root.as_str();
        let fs = if config.create_root_if_missing {
            OsFileSystem::create(root).map_err(|e| Error::io(Operation::List, "", root, e))?
        } else {
            let fs = OsFileSystem::new(root);
            if !fs.root().is_dir() {
                return Err(Error::NotFound {
                    op: Operation::List,
                    id: root.to_string(),
                });
            }
            fs
        };
        info!("opened request store at {}", root);
        Ok(Store::new(fs, KindRegistry::shared()).with_pretty_definitions(config.pretty_definitions))
    }
}

impl<F: FileSystem> Store<F> {
    /// Creates a store over `fs`, decoding kinds through `registry`.
    pub fn new(fs: F, registry: Arc<KindRegistry>) -> Self {
        Self {
            fs: Mutex::new(fs),
            registry,
            pretty: true,
        }
    }

    /// Chooses between indented and compact definition files.
    pub fn with_pretty_definitions(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// The registry the store decodes with.
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Every supported kind with its display name.
    pub fn kinds(&self) -> impl Iterator<Item = KindInfo> + Clone + '_ {
        self.registry.kinds()
    }

    /// Consumes the store and returns its filesystem.
    pub fn into_inner(self) -> F {
        self.fs.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, F> {
        // The guarded filesystem holds no invariants a panic could break.
        self.fs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists every request and directory, built fresh from disk.
    ///
    /// An empty store yields an empty tree. Orphaned history files and other
    /// files are ignored. A definition whose id is also a directory path can
    /// only come from hand-made files; it is logged and left out.
    pub fn list(&self) -> Result<Tree> {
        let fs = self.lock();
        debug!("listing requests");
        list_dir(&*fs, "")
    }

    /// Reads a request with its full history.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if there is no definition file
    /// - [`Error::UnknownKind`] if the definition names an unregistered kind
    /// - [`Error::Decode`] if the definition or any history line is malformed
    pub fn get(&self, id: &RequestId) -> Result<Request> {
        let fs = self.lock();
        debug!("get {}", id);
        let op = Operation::Get;
        let def = definition_path(id.as_str());
        let bytes = fs.read(&def).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFound {
                    op,
                    id: id.to_string(),
                }
            } else {
                Error::io(op, id.as_str(), &def, e)
            }
        })?;
        let data = codec::decode_request(&self.registry, &bytes)
            .map_err(|e| Error::decode(op, id.as_str(), &def, e))?;
        let history = history::read(&*fs, &self.registry, id, &data.kind())?;

        Ok(Request {
            id: id.clone(),
            data,
            history,
        })
    }

    /// Stores a new request with an empty history log.
    ///
    /// Missing parent directories are created. When the history file cannot
    /// be written the definition is removed again, so a request never exists
    /// without its log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if a request or directory already
    /// occupies `id`, or if one of its parent paths is a request.
    pub fn create(&self, id: &RequestId, data: &RequestData) -> Result<()> {
        let mut fs = self.lock();
        debug!("create {} ({})", id, data.kind());
        let op = Operation::Create;
        let def = definition_path(id.as_str());
        let hist = history_path(id.as_str());

        if let Some(path) = occupant(&*fs, op, id)? {
            return Err(Error::AlreadyExists {
                op,
                id: id.to_string(),
                path,
            });
        }

        let bytes = codec::encode_request_bytes(data, self.pretty).map_err(|source| {
            Error::Encode {
                op,
                id: id.to_string(),
                source,
            }
        })?;

        if let Some(dir) = id.parent() {
            fs.create_dir_all(dir)
                .map_err(|e| Error::io(op, id.as_str(), dir, e))?;
        }
        fs.write(&def, &bytes, WriteMode::CreateNew).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::AlreadyExists {
                    op,
                    id: id.to_string(),
                    path: def.clone(),
                }
            } else {
                Error::io(op, id.as_str(), &def, e)
            }
        })?;

        if stat(&*fs, op, id.as_str(), &hist)?.is_some() {
            warn!("truncating orphaned history {}", hist);
        }
        if let Err(e) = fs.write(&hist, b"", WriteMode::Truncate) {
            if let Err(cleanup) = fs.remove_file(&def) {
                warn!("could not remove {} after failed create: {}", def, cleanup);
            }
            return Err(Error::io(op, id.as_str(), &hist, e));
        }

        info!("created request {} ({})", id, data.kind());
        Ok(())
    }

    /// Replaces a request's definition. History is left alone.
    ///
    /// The new definition is written beside the old one and renamed over it,
    /// so a failed update leaves the original intact.
    ///
    /// # Errors
    ///
    /// - [`Error::KindMismatch`] if `kind` differs from `data`'s kind or from
    ///   the stored request's kind
    /// - [`Error::NotFound`] if the request does not exist
    /// - [`Error::Decode`] if the stored definition has no readable kind; such
    ///   a request has to be deleted and created again
    pub fn update(&self, id: &RequestId, kind: &Kind, data: &RequestData) -> Result<()> {
        let op = Operation::Update;
        if *kind != data.kind() {
            return Err(Error::KindMismatch {
                op,
                id: id.to_string(),
                expected: kind.clone(),
                actual: data.kind(),
            });
        }

        let mut fs = self.lock();
        debug!("update {} ({})", id, kind);
        let def = definition_path(id.as_str());
        let current = fs.read(&def).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFound {
                    op,
                    id: id.to_string(),
                }
            } else {
                Error::io(op, id.as_str(), &def, e)
            }
        })?;
        let stored = codec::read_kind(&current).map_err(|e| Error::decode(op, id.as_str(), &def, e))?;
        if stored != *kind {
            return Err(Error::KindMismatch {
                op,
                id: id.to_string(),
                expected: stored,
                actual: kind.clone(),
            });
        }

        let bytes = codec::encode_request_bytes(data, self.pretty).map_err(|source| {
            Error::Encode {
                op,
                id: id.to_string(),
                source,
            }
        })?;
        let tmp = format!("{}.{}.tmp", def, uuid::Uuid::new_v4());
        fs.write(&tmp, &bytes, WriteMode::CreateNew)
            .map_err(|e| Error::io(op, id.as_str(), &tmp, e))?;
        if let Err(e) = fs.rename(&tmp, &def) {
            if let Err(cleanup) = fs.remove_file(&tmp) {
                warn!("could not remove {}: {}", tmp, cleanup);
            }
            return Err(Error::io(op, id.as_str(), &def, e));
        }

        Ok(())
    }

    /// Moves a request (definition and history) or a whole directory.
    ///
    /// Missing parent directories of the target are created. A request
    /// without a history file is moved as is.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if `id` names neither a request nor a directory
    /// - [`Error::TargetExists`] if the target definition, history file or
    ///   directory already exists, or if a parent of the target is a request
    pub fn rename(&self, id: &RequestId, new_id: &RequestId) -> Result<()> {
        let mut fs = self.lock();
        debug!("rename {} -> {}", id, new_id);
        let op = Operation::Rename;

        let Some(source) = target(&*fs, op, id)? else {
            return Err(Error::NotFound {
                op,
                id: id.to_string(),
            });
        };
        if let Some(path) = occupant(&*fs, op, new_id)? {
            return Err(Error::TargetExists {
                op,
                id: id.to_string(),
                path,
            });
        }
        let new_hist = history_path(new_id.as_str());
        if stat(&*fs, op, id.as_str(), &new_hist)?.is_some() {
            return Err(Error::TargetExists {
                op,
                id: id.to_string(),
                path: new_hist,
            });
        }

        if source == Target::Dir && new_id.is_inside(id) {
            return Err(Error::TargetExists {
                op,
                id: id.to_string(),
                path: new_id.to_string(),
            });
        }

        if let Some(dir) = new_id.parent() {
            fs.create_dir_all(dir)
                .map_err(|e| Error::io(op, id.as_str(), dir, e))?;
        }

        match source {
            Target::Dir => {
                fs.rename(id.as_str(), new_id.as_str())
                    .map_err(|e| Error::io(op, id.as_str(), id.as_str(), e))?;
            }
            Target::Request => move_request(&mut *fs, id, new_id)?,
        }

        info!("renamed {} -> {}", id, new_id);
        Ok(())
    }

    /// Copies a request or directory to the first free `"<id> (n)"` name.
    ///
    /// A copied request starts with an empty history log; a copied directory
    /// keeps every file below it, histories included.
    ///
    /// # Returns
    ///
    /// The id of the copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` names neither a request nor a
    /// directory.
    pub fn duplicate(&self, id: &RequestId) -> Result<RequestId> {
        let mut fs = self.lock();
        debug!("duplicate {}", id);
        let op = Operation::Duplicate;

        let Some(source) = target(&*fs, op, id)? else {
            return Err(Error::NotFound {
                op,
                id: id.to_string(),
            });
        };

        let mut n = 1;
        let copy = loop {
            let candidate = id.with_copy_number(n);
            let taken = occupant(&*fs, op, &candidate)?.is_some()
                || stat(&*fs, op, id.as_str(), &history_path(candidate.as_str()))?.is_some();
            if !taken {
                break candidate;
            }
            n += 1;
        };

        match source {
            Target::Request => {
                let def = definition_path(id.as_str());
                let copy_def = definition_path(copy.as_str());
                let copy_hist = history_path(copy.as_str());
                let bytes = fs
                    .read(&def)
                    .map_err(|e| Error::io(op, id.as_str(), &def, e))?;
                fs.write(&copy_def, &bytes, WriteMode::CreateNew)
                    .map_err(|e| Error::io(op, id.as_str(), &copy_def, e))?;
                if let Err(e) = fs.write(&copy_hist, b"", WriteMode::Truncate) {
                    if let Err(cleanup) = fs.remove_file(&copy_def) {
                        warn!("could not remove {} after failed duplicate: {}", copy_def, cleanup);
                    }
                    return Err(Error::io(op, id.as_str(), &copy_hist, e));
                }
            }
            Target::Dir => copy_dir(&mut *fs, id.as_str(), id.as_str(), copy.as_str())?,
        }

        info!("duplicated {} -> {}", id, copy);
        Ok(copy)
    }

    /// Removes a request (definition, then history) or a whole directory.
    ///
    /// The two files of a request are removed one after the other; a crash
    /// in between leaves an orphaned history file. Deleting an id that only
    /// has such an orphan removes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing exists at `id`.
    pub fn delete(&self, id: &RequestId) -> Result<()> {
        let mut fs = self.lock();
        debug!("delete {}", id);
        let op = Operation::Delete;
        let def = definition_path(id.as_str());
        let hist = history_path(id.as_str());

        match target(&*fs, op, id)? {
            Some(Target::Request) => {
                fs.remove_file(&def)
                    .map_err(|e| Error::io(op, id.as_str(), &def, e))?;
                remove_if_present(&mut *fs, &hist)
                    .map_err(|e| Error::io(op, id.as_str(), &hist, e))?;
            }
            Some(Target::Dir) => {
                fs.remove_dir_all(id.as_str())
                    .map_err(|e| Error::io(op, id.as_str(), id.as_str(), e))?;
            }
            None => {
                if stat(&*fs, op, id.as_str(), &hist)? != Some(EntryType::File) {
                    return Err(Error::NotFound {
                        op,
                        id: id.to_string(),
                    });
                }
                warn!("removing orphaned history {}", hist);
                fs.remove_file(&hist)
                    .map_err(|e| Error::io(op, id.as_str(), &hist, e))?;
            }
        }

        info!("deleted {}", id);
        Ok(())
    }
}

fn stat<F: FileSystem + ?Sized>(
    fs: &F,
    op: Operation,
    id: &str,
    path: &str,
) -> Result<Option<EntryType>> {
    fs.stat(path).map_err(|e| Error::io(op, id, path, e))
}

fn target<F: FileSystem + ?Sized>(
    fs: &F,
    op: Operation,
    id: &RequestId,
) -> Result<Option<Target>> {
    let def = definition_path(id.as_str());
    if stat(fs, op, id.as_str(), &def)? == Some(EntryType::File) {
        return Ok(Some(Target::Request));
    }
    if stat(fs, op, id.as_str(), id.as_str())? == Some(EntryType::Dir) {
        return Ok(Some(Target::Dir));
    }
    Ok(None)
}

/// Returns the path that keeps `id` from being used for a new entry: an
/// existing definition or directory at `id`, or a request at one of its
/// parent paths.
fn occupant<F: FileSystem + ?Sized>(
    fs: &F,
    op: Operation,
    id: &RequestId,
) -> Result<Option<String>> {
    let def = definition_path(id.as_str());
    if stat(fs, op, id.as_str(), &def)?.is_some() {
        return Ok(Some(def));
    }
    if stat(fs, op, id.as_str(), id.as_str())?.is_some() {
        return Ok(Some(id.to_string()));
    }
    for ancestor in id.ancestors() {
        let ancestor_def = definition_path(ancestor);
        if stat(fs, op, id.as_str(), &ancestor_def)?.is_some() {
            return Ok(Some(ancestor_def));
        }
    }
    Ok(None)
}

fn remove_if_present<F: FileSystem + ?Sized>(fs: &mut F, path: &str) -> io::Result<()> {
    match fs.remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Moves both files of a request; undoes the first move if the second fails.
fn move_request<F: FileSystem + ?Sized>(
    fs: &mut F,
    id: &RequestId,
    new_id: &RequestId,
) -> Result<()> {
    let op = Operation::Rename;
    let def = definition_path(id.as_str());
    let hist = history_path(id.as_str());
    let new_def = definition_path(new_id.as_str());
    let new_hist = history_path(new_id.as_str());

    fs.rename(&def, &new_def)
        .map_err(|e| Error::io(op, id.as_str(), &def, e))?;
    match fs.rename(&hist, &new_hist) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} has no history to move", id);
            Ok(())
        }
        Err(e) => {
            if let Err(undo) = fs.rename(&new_def, &def) {
                warn!("could not move {} back to {}: {}", new_def, def, undo);
            }
            Err(Error::io(op, id.as_str(), &hist, e))
        }
    }
}

fn copy_dir<F: FileSystem + ?Sized>(fs: &mut F, id: &str, from: &str, to: &str) -> Result<()> {
    let op = Operation::Duplicate;
    fs.create_dir_all(to).map_err(|e| Error::io(op, id, to, e))?;
    let entries = fs.read_dir(from).map_err(|e| Error::io(op, id, from, e))?;
    for entry in entries {
        let source = fs::join(from, &entry.name);
        let dest = fs::join(to, &entry.name);
        match entry.entry_type {
            EntryType::Dir => copy_dir(fs, id, &source, &dest)?,
            EntryType::File => {
                let bytes = fs.read(&source).map_err(|e| Error::io(op, id, &source, e))?;
                fs.write(&dest, &bytes, WriteMode::CreateNew)
                    .map_err(|e| Error::io(op, id, &dest, e))?;
            }
        }
    }
    Ok(())
}

fn list_dir<F: FileSystem + ?Sized>(fs: &F, dir: &str) -> Result<Tree> {
    let op = Operation::List;
    let entries = fs.read_dir(dir).map_err(|e| Error::io(op, dir, dir, e))?;

    let mut tree = Tree::default();
    let mut histories = Vec::new();
    for entry in entries {
        match entry.entry_type {
            EntryType::Dir => {
                let path = fs::join(dir, &entry.name);
                let subtree = list_dir(fs, &path)?;
                tree.dirs.insert(entry.name, subtree);
            }
            EntryType::File => {
                if let Some(name) = entry.name.strip_suffix(REQUEST_SUFFIX) {
                    match RequestId::join(dir, name) {
                        Ok(id) => tree.request_ids.push(id),
                        Err(e) => warn!("skipping {}: {}", fs::join(dir, &entry.name), e),
                    }
                } else if let Some(name) = entry.name.strip_suffix(HISTORY_SUFFIX) {
                    histories.push(name.to_string());
                }
            }
        }
    }
    tree.request_ids.sort();

    for name in histories {
        if !tree.request_ids.iter().any(|id| id.name() == name) {
            warn!("orphaned history {}", history_path(&fs::join(dir, &name)));
        }
    }
    // An id never doubles as a directory path; the directory wins.
    tree.request_ids.retain(|id| {
        let shadowed = tree.dirs.contains_key(id.name());
        if shadowed {
            warn!("skipping request {}: a directory has the same path", id);
        }
        !shadowed
    });

    Ok(tree)
}
