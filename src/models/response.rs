//! Response variants, one struct per kind.

use super::{null_as_empty, KeyValue, Kind, Tagged};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Result of an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpResponse {
    /// Status code, e.g. 200.
    pub code: u16,

    /// Response body as text.
    pub body: String,

    /// Response headers.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: Vec<KeyValue>,
}

impl Tagged for HttpResponse {
    const KIND: Kind = Kind::HTTP;
}

/// Value type of a SQL result column.
///
/// Drivers may report types outside the four common ones (for example
/// `[]uint8` for raw bytes); those are kept verbatim in [`ColumnType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    String,
    Number,
    Time,
    Boolean,
    Other(String),
}

impl ColumnType {
    /// Type name of byte-slice columns, whose cells are stored base64-encoded.
    pub const BYTES: &'static str = "[]uint8";

    /// Returns the stored name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Time => "time",
            ColumnType::Boolean => "boolean",
            ColumnType::Other(name) => name,
        }
    }

    /// Whether cells of this column are base64 text on disk.
    pub fn is_bytes(&self) -> bool {
        self.as_str() == Self::BYTES
    }
}

impl From<String> for ColumnType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" => ColumnType::String,
            "number" => ColumnType::Number,
            "time" => ColumnType::Time,
            "boolean" => ColumnType::Boolean,
            _ => ColumnType::Other(name),
        }
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result set of a SQL query.
///
/// `types` is parallel to `columns`; each row holds one value per column.
/// Text cells of [`ColumnType::BYTES`] columns are base64-encoded when stored
/// and decoded on load. A cell that is not valid base64 of UTF-8 text is kept
/// as it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSqlResponse", into = "StoredSqlResponse")]
pub struct SqlResponse {
    pub columns: Vec<String>,
    pub types: Vec<ColumnType>,
    pub rows: Vec<Vec<Value>>,
}

/// On-disk shape of [`SqlResponse`], with byte cells still encoded.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredSqlResponse {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    #[serde(default, deserialize_with = "null_as_empty")]
    rows: Vec<Vec<Value>>,
}

fn map_byte_cells(
    types: &[ColumnType],
    rows: &mut [Vec<Value>],
    map: impl Fn(&str) -> Option<String>,
) {
    for row in rows.iter_mut() {
        for (cell, column_type) in row.iter_mut().zip(types) {
            if !column_type.is_bytes() {
                continue;
            }
            if let Value::String(text) = cell {
                if let Some(mapped) = map(text.as_str()) {
                    *text = mapped;
                }
            }
        }
    }
}

impl From<StoredSqlResponse> for SqlResponse {
    fn from(stored: StoredSqlResponse) -> Self {
        let StoredSqlResponse {
            columns,
            types,
            mut rows,
        } = stored;
        map_byte_cells(&types, &mut rows, |text| {
            STANDARD
                .decode(text)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        });
        SqlResponse {
            columns,
            types,
            rows,
        }
    }
}

impl From<SqlResponse> for StoredSqlResponse {
    fn from(resp: SqlResponse) -> Self {
        let SqlResponse {
            columns,
            types,
            mut rows,
        } = resp;
        map_byte_cells(&types, &mut rows, |text| Some(STANDARD.encode(text)));
        StoredSqlResponse {
            columns,
            types,
            rows,
        }
    }
}

impl Tagged for SqlResponse {
    const KIND: Kind = Kind::SQL;
}

/// Result of a gRPC call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrpcResponse {
    /// Response message as JSON text.
    pub response: String,

    /// gRPC status code (0 is OK).
    pub code: i32,

    /// Trailing metadata.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Vec<KeyValue>,
}

impl Tagged for GrpcResponse {
    const KIND: Kind = Kind::GRPC;
}

/// Serialized reply of a cache command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheResponse {
    pub response: String,
}

impl Tagged for CacheResponse {
    const KIND: Kind = Kind::CACHE;
}

/// Output lines of a JSON query transform, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryResponse {
    pub response: Vec<String>,
}

impl Tagged for QueryResponse {
    const KIND: Kind = Kind::QUERY;
}

/// Rendered Markdown output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkdownResponse {
    pub data: String,
}

impl Tagged for MarkdownResponse {
    const KIND: Kind = Kind::MARKDOWN;
}

/// A response of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Http(HttpResponse),
    Sql(SqlResponse),
    Grpc(GrpcResponse),
    Cache(CacheResponse),
    Query(QueryResponse),
    Markdown(MarkdownResponse),
}

impl ResponseData {
    /// Returns the kind of the active variant.
    pub fn kind(&self) -> Kind {
        match self {
            ResponseData::Http(resp) => resp.kind(),
            ResponseData::Sql(resp) => resp.kind(),
            ResponseData::Grpc(resp) => resp.kind(),
            ResponseData::Cache(resp) => resp.kind(),
            ResponseData::Query(resp) => resp.kind(),
            ResponseData::Markdown(resp) => resp.kind(),
        }
    }
}

macro_rules! response_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for ResponseData {
                fn from(resp: $ty) -> Self {
                    ResponseData::$variant(resp)
                }
            }
        )*
    };
}

response_from!(
    Http(HttpResponse),
    Sql(SqlResponse),
    Grpc(GrpcResponse),
    Cache(CacheResponse),
    Query(QueryResponse),
    Markdown(MarkdownResponse),
);
