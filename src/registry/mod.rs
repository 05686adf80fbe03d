//! Kind registry.
//!
//! The registry maps a [`Kind`] tag to the decoders for its request and
//! response variants, a display name and a template used for new requests.
//! It is built once, before any store operation, and handed to the store at
//! construction time. There is no runtime registration after that.

use crate::codec::CodecError;
use crate::models::{
    CacheRequest, CacheResponse, GrpcRequest, GrpcResponse, HttpRequest, HttpResponse, Kind,
    MarkdownRequest, MarkdownResponse, QueryRequest, QueryResponse, RequestData, ResponseData,
    SqlRequest, SqlResponse, Tagged,
};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Decodes the fields of one request variant (without the `kind` tag).
pub type RequestDecoder = fn(Value) -> Result<RequestData, serde_json::Error>;

/// Decodes the fields of one response variant (without the `kind` tag).
pub type ResponseDecoder = fn(Value) -> Result<ResponseData, serde_json::Error>;

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The same kind was registered twice.
    #[error("kind \"{0}\" is already registered")]
    DuplicateKind(Kind),
}

/// A kind and its display name, as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindInfo {
    pub kind: Kind,
    pub display_name: &'static str,
}

/// Everything the registry knows about one kind.
#[derive(Debug, Clone)]
pub struct KindEntry {
    kind: Kind,
    display_name: &'static str,
    decode_request: RequestDecoder,
    decode_response: ResponseDecoder,
    template: fn() -> RequestData,
}

fn decode_request_as<T>(fields: Value) -> Result<RequestData, serde_json::Error>
where
    T: DeserializeOwned + Into<RequestData>,
{
    serde_json::from_value::<T>(fields).map(Into::into)
}

fn decode_response_as<T>(fields: Value) -> Result<ResponseData, serde_json::Error>
where
    T: DeserializeOwned + Into<ResponseData>,
{
    serde_json::from_value::<T>(fields).map(Into::into)
}

impl KindEntry {
    /// Builds the entry for a request/response variant pair.
    ///
    /// The kind tag is taken from the request type, and new requests of this
    /// kind start from `template`.
    pub fn of<Req, Resp>(display_name: &'static str, template: fn() -> RequestData) -> Self
    where
        Req: Tagged + DeserializeOwned + Into<RequestData>,
        Resp: Tagged + DeserializeOwned + Into<ResponseData>,
    {
        debug_assert_eq!(Req::KIND, Resp::KIND);
        Self {
            kind: Req::KIND,
            display_name,
            decode_request: decode_request_as::<Req>,
            decode_response: decode_response_as::<Resp>,
            template,
        }
    }

    /// The kind tag.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Name shown to users, e.g. `REDIS` for the cache kind.
    pub fn display_name(&self) -> &'static str {
        self.display_name
    }
}

/// Table of every supported kind.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    entries: Vec<KindEntry>,
}

static SHARED: Lazy<Arc<KindRegistry>> = Lazy::new(|| Arc::new(KindRegistry::builtin()));

impl KindRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the six built-in kinds.
    pub fn builtin() -> Self {
        let entries = vec![
            KindEntry::of::<HttpRequest, HttpResponse>("HTTP", || {
                HttpRequest::default().into()
            }),
            KindEntry::of::<SqlRequest, SqlResponse>("SQL", || SqlRequest::default().into()),
            KindEntry::of::<GrpcRequest, GrpcResponse>("GRPC", || {
                GrpcRequest::default().into()
            }),
            KindEntry::of::<CacheRequest, CacheResponse>("REDIS", || {
                CacheRequest {
                    dsn: "redis://localhost:6379".to_string(),
                    query: "KEYS *".to_string(),
                }
                .into()
            }),
            KindEntry::of::<QueryRequest, QueryResponse>("JQ", || {
                QueryRequest {
                    query: ".".to_string(),
                    json: concat!(
                        "{\n",
                        "  \"string\": \"string\",\n",
                        "  \"number\": 42,\n",
                        "  \"bool\": true,\n",
                        "  \"list\": [1, 2, 3],\n",
                        "  \"null\": null\n",
                        "}"
                    )
                    .to_string(),
                }
                .into()
            }),
            KindEntry::of::<MarkdownRequest, MarkdownResponse>("MARKDOWN", || {
                MarkdownRequest::default().into()
            }),
        ];
        Self { entries }
    }

    /// Returns the process-wide built-in registry.
    ///
    /// The table is immutable; every caller gets the same `Arc`.
    pub fn shared() -> Arc<KindRegistry> {
        Arc::clone(&SHARED)
    }

    /// Adds a kind to the table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKind`] if the kind is already present.
    pub fn register(&mut self, entry: KindEntry) -> Result<(), RegistryError> {
        if self.entry(&entry.kind).is_some() {
            return Err(RegistryError::DuplicateKind(entry.kind));
        }
        self.entries.push(entry);
        Ok(())
    }

    fn entry(&self, kind: &Kind) -> Option<&KindEntry> {
        self.entries.iter().find(|entry| entry.kind == *kind)
    }

    /// Returns `true` if `kind` is registered.
    pub fn contains(&self, kind: &Kind) -> bool {
        self.entry(kind).is_some()
    }

    /// Resolves the request decoder for `kind`.
    pub fn request_decoder(&self, kind: &Kind) -> Result<RequestDecoder, CodecError> {
        self.entry(kind)
            .map(|entry| entry.decode_request)
            .ok_or_else(|| CodecError::UnknownKind(kind.clone()))
    }

    /// Resolves the response decoder for `kind`.
    pub fn response_decoder(&self, kind: &Kind) -> Result<ResponseDecoder, CodecError> {
        self.entry(kind)
            .map(|entry| entry.decode_response)
            .ok_or_else(|| CodecError::UnknownKind(kind.clone()))
    }

    /// Returns the starting definition for a new request of `kind`.
    pub fn template(&self, kind: &Kind) -> Result<RequestData, CodecError> {
        self.entry(kind)
            .map(|entry| (entry.template)())
            .ok_or_else(|| CodecError::UnknownKind(kind.clone()))
    }

    /// Iterates over every registered kind in registration order.
    ///
    /// The iterator is lazy and cheap to clone, so it can be restarted.
    pub fn kinds(&self) -> impl Iterator<Item = KindInfo> + Clone + '_ {
        self.entries.iter().map(|entry| KindInfo {
            kind: entry.kind.clone(),
            display_name: entry.display_name,
        })
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_kinds_in_order() {
        let registry = KindRegistry::builtin();
        let kinds: Vec<_> = registry.kinds().map(|info| info.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::HTTP,
                Kind::SQL,
                Kind::GRPC,
                Kind::CACHE,
                Kind::QUERY,
                Kind::MARKDOWN
            ]
        );
    }

    #[test]
    fn test_kinds_iterator_is_restartable() {
        let registry = KindRegistry::builtin();
        let kinds = registry.kinds();
        assert_eq!(kinds.clone().count(), 6);
        assert_eq!(kinds.count(), 6);
        assert_eq!(registry.kinds().count(), registry.len());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = KindRegistry::builtin();
        let err = registry
            .register(KindEntry::of::<HttpRequest, HttpResponse>("HTTP again", || {
                HttpRequest::default().into()
            }))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKind(Kind::HTTP));
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_unknown_kind_is_reported() {
        let registry = KindRegistry::new();
        assert!(registry.is_empty());
        let err = registry.request_decoder(&Kind::new("ftp")).unwrap_err();
        assert!(matches!(err, CodecError::UnknownKind(kind) if kind.as_str() == "ftp"));
    }

    #[test]
    fn test_resolved_decoder_builds_variant() {
        let registry = KindRegistry::builtin();
        let decode = registry.request_decoder(&Kind::CACHE).unwrap();
        let data = decode(json!({"query": "PING"})).unwrap();
        assert_eq!(
            data,
            RequestData::Cache(CacheRequest {
                dsn: String::new(),
                query: "PING".to_string()
            })
        );
    }

    #[test]
    fn test_templates_match_their_kind() {
        let registry = KindRegistry::builtin();
        for info in registry.kinds() {
            assert_eq!(registry.template(&info.kind).unwrap().kind(), info.kind);
        }
    }

    #[test]
    fn test_shared_registry_is_reused() {
        let a = KindRegistry::shared();
        let b = KindRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
