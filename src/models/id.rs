//! Request identifiers.
//!
//! A [`RequestId`] is a `/`-separated path relative to the store root. It
//! names a request definition (`<id>.request.json`) or, for directory-level
//! operations, a directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a string is rejected as a request id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid request id {id:?}: {reason}")]
pub struct IdError {
    /// The rejected input.
    pub id: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// Path-like identifier of a stored request or directory.
///
/// Always non-empty, never absolute, and free of `.`/`..` segments, so it
/// cannot escape the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Parses and validates a request id.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the id is empty, absolute, contains empty,
    /// `.` or `..` segments, or contains a backslash or NUL byte.
    pub fn parse(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("empty id")
        } else if id.starts_with('/') {
            Some("absolute path")
        } else if id.contains('\\') || id.contains('\0') {
            Some("contains a backslash or NUL byte")
        } else if id.split('/').any(str::is_empty) {
            Some("empty path segment")
        } else if id.split('/').any(|s| s == "." || s == "..") {
            Some("relative path segment")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(IdError { id, reason }),
            None => Ok(Self(id)),
        }
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the directory part, or `None` for a top-level id.
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Returns every proper ancestor path, outermost first.
    ///
    /// `"a/b/c"` yields `"a"` and `"a/b"`.
    pub fn ancestors(&self) -> impl Iterator<Item = &str> {
        self.0
            .match_indices('/')
            .map(move |(index, _)| &self.0[..index])
    }

    /// Returns `true` if `self` lies strictly inside the directory `other`.
    pub fn is_inside(&self, other: &RequestId) -> bool {
        self.0.len() > other.0.len()
            && self.0.starts_with(&other.0)
            && self.0.as_bytes()[other.0.len()] == b'/'
    }

    /// Returns the id with a ` (n)` copy marker appended to its last segment.
    pub fn with_copy_number(&self, n: usize) -> RequestId {
        RequestId(format!("{} ({})", self.0, n))
    }

    /// Joins a directory path and a child name.
    ///
    /// Used when the parts are known to be valid, e.g. names read back from
    /// the store itself.
    pub(crate) fn join(dir: &str, name: &str) -> Result<RequestId, IdError> {
        if dir.is_empty() {
            RequestId::parse(name)
        } else {
            RequestId::parse(format!("{}/{}", dir, name))
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RequestId {
    type Error = IdError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        RequestId::parse(id)
    }
}

impl TryFrom<&str> for RequestId {
    type Error = IdError;

    fn try_from(id: &str) -> Result<Self, Self::Error> {
        RequestId::parse(id)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        for id in ["a", "a/b", "dir/sub dir/req (1)", "x.y"] {
            assert!(RequestId::parse(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn test_parse_rejects_escaping_ids() {
        for id in ["", "/abs", "a//b", "a/", "../x", "a/./b", "a\\b", "nul\0"] {
            let err = RequestId::parse(id).unwrap_err();
            assert_eq!(err.id, id);
        }
    }

    #[test]
    fn test_name_and_parent() {
        let id = RequestId::parse("a/b/c").unwrap();
        assert_eq!(id.name(), "c");
        assert_eq!(id.parent(), Some("a/b"));

        let top = RequestId::parse("top").unwrap();
        assert_eq!(top.name(), "top");
        assert_eq!(top.parent(), None);
    }

    #[test]
    fn test_ancestors() {
        let id = RequestId::parse("a/b/c").unwrap();
        assert_eq!(id.ancestors().collect::<Vec<_>>(), vec!["a", "a/b"]);
        assert_eq!(RequestId::parse("a").unwrap().ancestors().count(), 0);
    }

    #[test]
    fn test_is_inside() {
        let dir = RequestId::parse("a").unwrap();
        assert!(RequestId::parse("a/b").unwrap().is_inside(&dir));
        assert!(!RequestId::parse("ab").unwrap().is_inside(&dir));
        assert!(!dir.is_inside(&dir));
    }

    #[test]
    fn test_with_copy_number() {
        let id = RequestId::parse("dir/foo").unwrap();
        assert_eq!(id.with_copy_number(2).as_str(), "dir/foo (2)");
    }

    #[test]
    fn test_serde_validates() {
        let id: RequestId = serde_json::from_str("\"a/b\"").unwrap();
        assert_eq!(id.as_str(), "a/b");
        assert!(serde_json::from_str::<RequestId>("\"../etc\"").is_err());
    }
}
