//! Request variants, one struct per kind.
//!
//! Field defaults here are part of the storage format: a definition file may
//! omit any defaulted field and must decode to exactly these values.

use super::{null_as_empty, KeyValue, Kind, Tagged};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_http_method() -> String {
    "GET".to_string()
}

fn default_grpc_payload() -> String {
    "{}".to_string()
}

fn default_query_filter() -> String {
    ".".to_string()
}

/// An HTTP request definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRequest {
    /// Target URL.
    #[serde(default)]
    pub url: String,

    /// HTTP method, stored verbatim. Defaults to `GET`.
    #[serde(default = "default_http_method")]
    pub method: String,

    /// Raw request body.
    #[serde(default)]
    pub body: String,

    /// Request headers in send order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: Vec<KeyValue>,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: default_http_method(),
            body: String::new(),
            headers: Vec::new(),
        }
    }
}

impl Tagged for HttpRequest {
    const KIND: Kind = Kind::HTTP;
}

/// SQL database dialect.
///
/// Names outside the four known dialects, including the empty string, are
/// kept verbatim in [`Database::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Database {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
    Clickhouse,
    Other(String),
}

impl Database {
    /// All known dialects with their display names, for populating pickers.
    pub const ALL: [(Database, &'static str); 4] = [
        (Database::Postgres, "POSTGRES"),
        (Database::Mysql, "MYSQL"),
        (Database::Sqlite, "SQLITE"),
        (Database::Clickhouse, "CLICKHOUSE"),
    ];

    /// Returns the stored tag of the dialect.
    pub fn as_str(&self) -> &str {
        match self {
            Database::Postgres => "postgres",
            Database::Mysql => "mysql",
            Database::Sqlite => "sqlite",
            Database::Clickhouse => "clickhouse",
            Database::Other(name) => name,
        }
    }
}

impl From<String> for Database {
    fn from(name: String) -> Self {
        match name.as_str() {
            "postgres" => Database::Postgres,
            "mysql" => Database::Mysql,
            "sqlite" => Database::Sqlite,
            "clickhouse" => Database::Clickhouse,
            _ => Database::Other(name),
        }
    }
}

impl From<Database> for String {
    fn from(database: Database) -> Self {
        match database {
            Database::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SQL query definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlRequest {
    /// Connection string.
    #[serde(default)]
    pub dsn: String,

    /// Dialect used to interpret `dsn`.
    #[serde(default)]
    pub database: Database,

    /// Query text. Required.
    pub query: String,
}

impl Tagged for SqlRequest {
    const KIND: Kind = Kind::SQL;
}

/// A gRPC unary call definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrpcRequest {
    /// Server address.
    #[serde(default)]
    pub target: String,

    /// Fully-qualified method name, e.g. `pkg.Service/Method`.
    #[serde(default)]
    pub method: String,

    /// Request message as JSON text. Defaults to `{}`.
    #[serde(default = "default_grpc_payload")]
    pub payload: String,

    /// Call metadata.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Vec<KeyValue>,
}

impl Default for GrpcRequest {
    fn default() -> Self {
        Self {
            target: String::new(),
            method: String::new(),
            payload: default_grpc_payload(),
            metadata: Vec::new(),
        }
    }
}

impl Tagged for GrpcRequest {
    const KIND: Kind = Kind::GRPC;
}

/// A key-value cache command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheRequest {
    /// Connection string.
    #[serde(default)]
    pub dsn: String,

    /// Raw command line, e.g. `GET key`. Required.
    pub query: String,
}

impl Tagged for CacheRequest {
    const KIND: Kind = Kind::CACHE;
}

/// A JSON query transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryRequest {
    /// Filter expression. Defaults to the identity filter `.`.
    #[serde(default = "default_query_filter")]
    pub query: String,

    /// Input text: one or more JSON documents. Required.
    pub json: String,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            query: default_query_filter(),
            json: String::new(),
        }
    }
}

impl Tagged for QueryRequest {
    const KIND: Kind = Kind::QUERY;
}

/// A Markdown document to render.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkdownRequest {
    /// Raw markup. Required.
    pub data: String,
}

impl Tagged for MarkdownRequest {
    const KIND: Kind = Kind::MARKDOWN;
}

/// A request definition of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestData {
    Http(HttpRequest),
    Sql(SqlRequest),
    Grpc(GrpcRequest),
    Cache(CacheRequest),
    Query(QueryRequest),
    Markdown(MarkdownRequest),
}

impl RequestData {
    /// Returns the kind of the active variant.
    pub fn kind(&self) -> Kind {
        match self {
            RequestData::Http(req) => req.kind(),
            RequestData::Sql(req) => req.kind(),
            RequestData::Grpc(req) => req.kind(),
            RequestData::Cache(req) => req.kind(),
            RequestData::Query(req) => req.kind(),
            RequestData::Markdown(req) => req.kind(),
        }
    }
}

macro_rules! request_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for RequestData {
                fn from(req: $ty) -> Self {
                    RequestData::$variant(req)
                }
            }
        )*
    };
}

request_from!(
    Http(HttpRequest),
    Sql(SqlRequest),
    Grpc(GrpcRequest),
    Cache(CacheRequest),
    Query(QueryRequest),
    Markdown(MarkdownRequest),
);
