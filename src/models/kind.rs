//! Request kind tags.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Discriminator selecting which request/response variant applies.
///
/// Kinds are plain string tags so that stored files stay readable and new
/// kinds can be added without touching the wire format. A request's kind is
/// fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(Cow<'static, str>);

impl Kind {
    /// HTTP requests.
    pub const HTTP: Kind = Kind::from_static("http");
    /// SQL queries.
    pub const SQL: Kind = Kind::from_static("sql");
    /// gRPC unary calls.
    pub const GRPC: Kind = Kind::from_static("grpc");
    /// Key-value cache commands.
    pub const CACHE: Kind = Kind::from_static("cache");
    /// JSON query transforms.
    pub const QUERY: Kind = Kind::from_static("query");
    /// Markdown document rendering.
    pub const MARKDOWN: Kind = Kind::from_static("markdown");

    /// Creates a kind from a static tag.
    pub const fn from_static(tag: &'static str) -> Self {
        Kind(Cow::Borrowed(tag))
    }

    /// Creates a kind from an owned tag, e.g. one read from disk.
    pub fn new(tag: impl Into<String>) -> Self {
        Kind(Cow::Owned(tag.into()))
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Kind {
    fn from(tag: &str) -> Self {
        Kind::new(tag)
    }
}

/// Implemented by every request and response variant struct.
pub trait Tagged {
    /// The kind this variant belongs to.
    const KIND: Kind;

    /// Returns the variant's kind.
    fn kind(&self) -> Kind {
        Self::KIND
    }
}
