//! Data models for stored requests, their responses and execution history.
//!
//! Every request kind has a request struct and a response struct. The two
//! closed unions [`RequestData`] and [`ResponseData`] wrap them, and the
//! [`Kind`] tag selects which variant applies. Decoding and encoding of these
//! unions lives in [`crate::codec`]; the structs here only describe the
//! per-kind field schemas and their defaults.

pub mod history;
pub mod id;
pub mod kind;
pub mod request;
pub mod response;
pub mod tree;

pub use history::{HistoryEntry, Request};
pub use id::{IdError, RequestId};
pub use kind::{Kind, Tagged};
pub use request::{
    CacheRequest, Database, GrpcRequest, HttpRequest, MarkdownRequest, QueryRequest, RequestData,
    SqlRequest,
};
pub use response::{
    CacheResponse, ColumnType, GrpcResponse, HttpResponse, MarkdownResponse, QueryResponse,
    ResponseData, SqlResponse,
};
pub use tree::Tree;

use serde::{Deserialize, Deserializer, Serialize};

/// An ordered key/value pair.
///
/// Used for HTTP headers and gRPC metadata, where order and duplicate keys
/// are both meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    /// Creates a new key/value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Deserializes a list that may be stored as `null`, treating `null` as empty.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}
