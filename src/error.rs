//! Error types for store and dispatcher operations.
//!
//! Every error names the operation that failed and the request id or path it
//! was working on. Nothing is retried; the first failure is returned.

use crate::codec::CodecError;
use crate::dispatcher::SendError;
use crate::models::{IdError, Kind};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Rename,
    Duplicate,
    Delete,
    Append,
    Perform,
}

impl Operation {
    /// Returns the operation name as used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Rename => "rename",
            Operation::Duplicate => "duplicate",
            Operation::Delete => "delete",
            Operation::Append => "append history",
            Operation::Perform => "perform",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`Store`](crate::store::Store) and
/// [`Dispatcher`](crate::dispatcher::Dispatcher) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Neither a request nor a directory exists at the id.
    #[error("{op} {id:?}: not found")]
    NotFound { op: Operation, id: String },

    /// A request or directory already occupies the id.
    #[error("{op} {id:?}: {path:?} already exists")]
    AlreadyExists {
        op: Operation,
        id: String,
        path: String,
    },

    /// A rename target is taken; the caller must delete it first.
    #[error("{op} {id:?}: target {path:?} already exists, delete it first")]
    TargetExists {
        op: Operation,
        id: String,
        path: String,
    },

    /// A stored definition names a kind the registry does not know.
    #[error("{op} {id:?}: unknown request kind \"{kind}\"")]
    UnknownKind { op: Operation, id: String, kind: Kind },

    /// The supplied kind disagrees with the data or with the stored request.
    #[error("{op} {id:?}: kind mismatch: expected \"{expected}\", got \"{actual}\"")]
    KindMismatch {
        op: Operation,
        id: String,
        expected: Kind,
        actual: Kind,
    },

    /// No sender is configured for the request's kind.
    #[error("{op} {id:?}: unsupported request kind \"{kind}\"")]
    UnsupportedKind { op: Operation, id: String, kind: Kind },

    /// A stored file could not be decoded.
    #[error("{op} {id:?}: decode {path:?}: {source}")]
    Decode {
        op: Operation,
        id: String,
        path: String,
        #[source]
        source: CodecError,
    },

    /// A value could not be encoded for storage or display.
    #[error("{op} {id:?}: encode: {source}")]
    Encode {
        op: Operation,
        id: String,
        #[source]
        source: CodecError,
    },

    /// A filesystem operation failed.
    #[error("{op} {id:?}: {path:?}: {source}")]
    Io {
        op: Operation,
        id: String,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The external sender reported a failure.
    #[error("{op} {id:?}: {source}")]
    Send {
        op: Operation,
        id: String,
        #[source]
        source: SendError,
    },

    /// The id is not a valid request path.
    #[error(transparent)]
    InvalidId(#[from] IdError),
}

impl Error {
    /// The operation the error originated from, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::NotFound { op, .. }
            | Error::AlreadyExists { op, .. }
            | Error::TargetExists { op, .. }
            | Error::UnknownKind { op, .. }
            | Error::KindMismatch { op, .. }
            | Error::UnsupportedKind { op, .. }
            | Error::Decode { op, .. }
            | Error::Encode { op, .. }
            | Error::Io { op, .. }
            | Error::Send { op, .. } => Some(*op),
            Error::InvalidId(_) => None,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is an AlreadyExists error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// Check if this is a TargetExists error
    pub fn is_target_exists(&self) -> bool {
        matches!(self, Error::TargetExists { .. })
    }

    /// Check if this is a KindMismatch error
    pub fn is_kind_mismatch(&self) -> bool {
        matches!(self, Error::KindMismatch { .. })
    }

    /// Check if this is an UnknownKind error
    pub fn is_unknown_kind(&self) -> bool {
        matches!(self, Error::UnknownKind { .. })
    }

    /// Check if this is a Decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }

    /// Check if this is a Send error
    pub fn is_send(&self) -> bool {
        matches!(self, Error::Send { .. })
    }

    /// Maps a codec failure on a stored file to `UnknownKind` or `Decode`.
    pub(crate) fn decode(op: Operation, id: &str, path: &str, source: CodecError) -> Self {
        match source.unknown_kind() {
            Some(kind) => Error::UnknownKind {
                op,
                id: id.to_string(),
                kind: kind.clone(),
            },
            None => Error::Decode {
                op,
                id: id.to_string(),
                path: path.to_string(),
                source,
            },
        }
    }

    pub(crate) fn io(op: Operation, id: &str, path: &str, source: io::Error) -> Self {
        Error::Io {
            op,
            id: id.to_string(),
            path: path.to_string(),
            source,
        }
    }
}
