//! Tagged encoding and decoding of requests, responses and history entries.
//!
//! Definition files are single JSON objects: the variant's fields plus a
//! `kind` tag. History logs are JSON Lines; each line holds `sent_at`,
//! `received_at`, `request` and `response`, and the nested objects carry no
//! `kind` of their own. An entry's kind is inherited from the request that
//! owns the log, so decoding a history entry always takes that kind as a
//! parameter.
//!
//! Decoding goes through a [`KindRegistry`]; encoding needs no registry since
//! the active variant already knows its kind.

use crate::models::{HistoryEntry, Kind, RequestData, ResponseData};
use crate::registry::KindRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the discriminator field.
pub const KIND_FIELD: &str = "kind";

/// Errors produced while encoding or decoding tagged values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The `kind` tag names no registered kind.
    #[error("unknown request kind \"{0}\"")]
    UnknownKind(Kind),

    /// The `kind` tag is absent or not a string.
    #[error("missing or non-string \"kind\" field")]
    MissingKind,

    /// The payload is valid JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// A history entry names a kind other than its request's.
    #[error("history entry of kind \"{found}\" in a \"{expected}\" request")]
    MixedKind { expected: Kind, found: Kind },

    /// A line of a history log failed to decode.
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<CodecError>,
    },

    /// Malformed JSON or a field that does not fit the variant's schema.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// Returns the unknown kind, looking through line context.
    pub fn unknown_kind(&self) -> Option<&Kind> {
        match self {
            CodecError::UnknownKind(kind) => Some(kind),
            CodecError::Line { source, .. } => source.unknown_kind(),
            _ => None,
        }
    }
}

/// On-disk shape of one history line.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEntry {
    sent_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
    request: Value,
    response: Value,
}

fn into_object(value: Value) -> Result<Map<String, Value>, CodecError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CodecError::NotAnObject),
    }
}

fn take_kind(fields: &mut Map<String, Value>) -> Result<Option<Kind>, CodecError> {
    match fields.remove(KIND_FIELD) {
        None => Ok(None),
        Some(Value::String(tag)) => Ok(Some(Kind::new(tag))),
        Some(_) => Err(CodecError::MissingKind),
    }
}

/// Serializes the fields of the active request variant, without a tag.
pub fn request_fields(data: &RequestData) -> Result<Map<String, Value>, CodecError> {
    let value = match data {
        RequestData::Http(req) => serde_json::to_value(req),
        RequestData::Sql(req) => serde_json::to_value(req),
        RequestData::Grpc(req) => serde_json::to_value(req),
        RequestData::Cache(req) => serde_json::to_value(req),
        RequestData::Query(req) => serde_json::to_value(req),
        RequestData::Markdown(req) => serde_json::to_value(req),
    }?;
    into_object(value)
}

/// Serializes the fields of the active response variant, without a tag.
pub fn response_fields(data: &ResponseData) -> Result<Map<String, Value>, CodecError> {
    let value = match data {
        ResponseData::Http(resp) => serde_json::to_value(resp),
        ResponseData::Sql(resp) => serde_json::to_value(resp),
        ResponseData::Grpc(resp) => serde_json::to_value(resp),
        ResponseData::Cache(resp) => serde_json::to_value(resp),
        ResponseData::Query(resp) => serde_json::to_value(resp),
        ResponseData::Markdown(resp) => serde_json::to_value(resp),
    }?;
    into_object(value)
}

/// Encodes a request definition as a tagged JSON object.
pub fn encode_request(data: &RequestData) -> Result<Value, CodecError> {
    let mut fields = request_fields(data)?;
    fields.insert(KIND_FIELD.to_string(), Value::String(data.kind().to_string()));
    Ok(Value::Object(fields))
}

/// Encodes a request definition as file contents.
///
/// Pretty output is indented by two spaces and ends with a newline.
pub fn encode_request_bytes(data: &RequestData, pretty: bool) -> Result<Vec<u8>, CodecError> {
    let value = encode_request(data)?;
    if pretty {
        let mut bytes = serde_json::to_vec_pretty(&value)?;
        bytes.push(b'\n');
        Ok(bytes)
    } else {
        Ok(serde_json::to_vec(&value)?)
    }
}

/// Encodes a response as a tagged JSON object, the form shown to callers.
pub fn encode_response(data: &ResponseData) -> Result<Value, CodecError> {
    let mut fields = response_fields(data)?;
    fields.insert(KIND_FIELD.to_string(), Value::String(data.kind().to_string()));
    Ok(Value::Object(fields))
}

/// Decodes a tagged request object.
///
/// # Errors
///
/// - [`CodecError::MissingKind`] if there is no string `kind` field
/// - [`CodecError::UnknownKind`] if the kind is not registered
/// - [`CodecError::Json`] if a field does not fit the variant's schema
pub fn decode_request_value(
    registry: &KindRegistry,
    value: Value,
) -> Result<RequestData, CodecError> {
    let mut fields = into_object(value)?;
    let kind = take_kind(&mut fields)?.ok_or(CodecError::MissingKind)?;
    let decode = registry.request_decoder(&kind)?;
    Ok(decode(Value::Object(fields))?)
}

/// Decodes a request definition file.
pub fn decode_request(registry: &KindRegistry, bytes: &[u8]) -> Result<RequestData, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    decode_request_value(registry, value)
}

/// Reads only the `kind` tag of a definition file.
pub fn read_kind(bytes: &[u8]) -> Result<Kind, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let mut fields = into_object(value)?;
    take_kind(&mut fields)?.ok_or(CodecError::MissingKind)
}

/// Decodes a tagged response object.
pub fn decode_response_value(
    registry: &KindRegistry,
    value: Value,
) -> Result<ResponseData, CodecError> {
    let mut fields = into_object(value)?;
    let kind = take_kind(&mut fields)?.ok_or(CodecError::MissingKind)?;
    let decode = registry.response_decoder(&kind)?;
    Ok(decode(Value::Object(fields))?)
}

/// Strips a stray `kind` tag from an inherited-kind object, rejecting it if
/// it disagrees with the owning request.
fn inherit_kind(value: Value, kind: &Kind) -> Result<Value, CodecError> {
    let mut fields = into_object(value)?;
    match take_kind(&mut fields)? {
        Some(found) if found != *kind => Err(CodecError::MixedKind {
            expected: kind.clone(),
            found,
        }),
        _ => Ok(Value::Object(fields)),
    }
}

/// Encodes one history entry as a single JSON line, without the newline.
pub fn encode_history_entry(entry: &HistoryEntry) -> Result<String, CodecError> {
    let wire = WireEntry {
        sent_at: entry.sent_at,
        received_at: entry.received_at,
        request: Value::Object(request_fields(&entry.request)?),
        response: Value::Object(response_fields(&entry.response)?),
    };
    Ok(serde_json::to_string(&wire)?)
}

/// Decodes one history line using the owning request's kind.
///
/// The entry's request and response must both decode as variants of `kind`.
pub fn decode_history_entry(
    registry: &KindRegistry,
    kind: &Kind,
    line: &[u8],
) -> Result<HistoryEntry, CodecError> {
    let wire: WireEntry = serde_json::from_slice(line)?;
    let decode_request = registry.request_decoder(kind)?;
    let decode_response = registry.response_decoder(kind)?;
    Ok(HistoryEntry {
        sent_at: wire.sent_at,
        received_at: wire.received_at,
        request: decode_request(inherit_kind(wire.request, kind)?)?,
        response: decode_response(inherit_kind(wire.response, kind)?)?,
    })
}

/// Decodes a whole history log, oldest entry first.
///
/// Blank lines are skipped. Any other line that fails to decode aborts the
/// read with [`CodecError::Line`]; nothing is silently dropped.
pub fn decode_history(
    registry: &KindRegistry,
    kind: &Kind,
    log: &[u8],
) -> Result<Vec<HistoryEntry>, CodecError> {
    let mut entries = Vec::new();
    for (index, line) in log.split(|byte| *byte == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let entry = decode_history_entry(registry, kind, line).map_err(|source| {
            CodecError::Line {
                line: index + 1,
                source: Box::new(source),
            }
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
