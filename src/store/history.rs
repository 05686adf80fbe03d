//! Per-request history logs.
//!
//! A log is a JSONL file next to the request definition. Entries are only
//! ever appended, one line per execution, oldest first.

use super::{history_path, Store};
use crate::codec;
use crate::error::{Error, Operation, Result};
use crate::fs::FileSystem;
use crate::models::{HistoryEntry, Kind, RequestId};
use crate::registry::KindRegistry;
use log::debug;
use std::io;

/// Reads and decodes the whole log of `id`. A missing log is an empty one.
pub(super) fn read<F: FileSystem + ?Sized>(
    fs: &F,
    registry: &KindRegistry,
    id: &RequestId,
    kind: &Kind,
) -> Result<Vec<HistoryEntry>> {
    let op = Operation::Get;
    let path = history_path(id.as_str());
    let bytes = match fs.read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} has no history file", id);
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::io(op, id.as_str(), &path, e)),
    };
    codec::decode_history(registry, kind, &bytes).map_err(|e| Error::decode(op, id.as_str(), &path, e))
}

impl<F: FileSystem> Store<F> {
    /// Appends one entry to the history log of `id`.
    ///
    /// The log and its parent directories are created when missing; the
    /// definition file does not have to exist. Earlier lines are never
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the entry cannot be serialized and
    /// [`Error::Io`] if the write fails.
    pub fn append_history(&self, id: &RequestId, entry: &HistoryEntry) -> Result<()> {
        let op = Operation::Append;
        let mut line = codec::encode_history_entry(entry).map_err(|source| Error::Encode {
            op,
            id: id.to_string(),
            source,
        })?;
        line.push('\n');

        let mut fs = self.lock();
        debug!("append history {} ({})", id, entry.request.kind());
        let path = history_path(id.as_str());
        if let Some(dir) = id.parent() {
            fs.create_dir_all(dir)
                .map_err(|e| Error::io(op, id.as_str(), dir, e))?;
        }
        fs.append(&path, line.as_bytes())
            .map_err(|e| Error::io(op, id.as_str(), &path, e))
    }

    /// Number of entries in the log of `id`, without decoding them.
    pub fn history_len(&self, id: &RequestId) -> Result<usize> {
        let fs = self.lock();
        let path = history_path(id.as_str());
        match fs.read(&path) {
            Ok(bytes) => Ok(bytes
                .split(|byte| *byte == b'\n')
                .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
                .count()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(Error::io(Operation::Get, id.as_str(), &path, e)),
        }
    }
}
