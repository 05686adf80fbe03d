//! Request execution.
//!
//! The [`Dispatcher`] loads a stored request, hands it to the sender for its
//! kind, stamps the timing and appends the outcome to the request's history.
//! Senders are plain collaborators: anything implementing [`Sender`] for the
//! right request/response pair, closures included.
//!
//! Only the load and the history append take the store lock. The send itself
//! runs unlocked, so independent requests can be in flight at the same time.

use crate::codec;
use crate::error::{Error, Operation, Result};
use crate::fs::FileSystem;
use crate::models::{
    CacheRequest, CacheResponse, GrpcRequest, GrpcResponse, HistoryEntry, HttpRequest,
    HttpResponse, MarkdownRequest, MarkdownResponse, QueryResponse, RequestData, RequestId,
    ResponseData, SqlRequest, SqlResponse,
};
use crate::query::PathEvaluator;
use crate::store::Store;
use chrono::Utc;
use log::{debug, info};
use serde_json::{Deserializer, Value};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Failure reported by a sender or query evaluator.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SendError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl SendError {
    /// Creates an error with a message and no underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Executes one kind of request against a live endpoint.
pub trait Sender<Req, Resp>: Send + Sync {
    /// Sends `request` and waits for its response.
    fn send(&self, request: &Req) -> std::result::Result<Resp, SendError>;
}

impl<Req, Resp, F> Sender<Req, Resp> for F
where
    F: Fn(&Req) -> std::result::Result<Resp, SendError> + Send + Sync,
{
    fn send(&self, request: &Req) -> std::result::Result<Resp, SendError> {
        self(request)
    }
}

/// Evaluates a query filter against one JSON document.
///
/// Each produced value is rendered as a string; a filter may produce any
/// number of values.
pub trait QueryEvaluator: Send + Sync {
    fn evaluate(&self, filter: &str, input: &Value) -> std::result::Result<Vec<String>, SendError>;
}

type BoxedSender<Req, Resp> = Box<dyn Sender<Req, Resp>>;

/// The set of senders a dispatcher routes to, at most one per kind.
///
/// A kind without a sender fails to perform with [`Error::UnsupportedKind`].
/// `Senders::default()` has only the built-in [`PathEvaluator`] for query
/// requests; [`Senders::empty`] has nothing at all.
pub struct Senders {
    http: Option<BoxedSender<HttpRequest, HttpResponse>>,
    sql: Option<BoxedSender<SqlRequest, SqlResponse>>,
    grpc: Option<BoxedSender<GrpcRequest, GrpcResponse>>,
    cache: Option<BoxedSender<CacheRequest, CacheResponse>>,
    markdown: Option<BoxedSender<MarkdownRequest, MarkdownResponse>>,
    query: Option<Box<dyn QueryEvaluator>>,
}

impl Default for Senders {
    fn default() -> Self {
        Self::empty().with_query_evaluator(PathEvaluator)
    }
}

impl fmt::Debug for Senders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Senders")
            .field("http", &self.http.is_some())
            .field("sql", &self.sql.is_some())
            .field("grpc", &self.grpc.is_some())
            .field("cache", &self.cache.is_some())
            .field("markdown", &self.markdown.is_some())
            .field("query", &self.query.is_some())
            .finish()
    }
}

impl Senders {
    /// A set with no senders installed.
    pub fn empty() -> Self {
        Self {
            http: None,
            sql: None,
            grpc: None,
            cache: None,
            markdown: None,
            query: None,
        }
    }

    pub fn with_http(mut self, sender: impl Sender<HttpRequest, HttpResponse> + 'static) -> Self {
        self.http = Some(Box::new(sender));
        self
    }

    pub fn with_sql(mut self, sender: impl Sender<SqlRequest, SqlResponse> + 'static) -> Self {
        self.sql = Some(Box::new(sender));
        self
    }

    pub fn with_grpc(mut self, sender: impl Sender<GrpcRequest, GrpcResponse> + 'static) -> Self {
        self.grpc = Some(Box::new(sender));
        self
    }

    pub fn with_cache(
        mut self,
        sender: impl Sender<CacheRequest, CacheResponse> + 'static,
    ) -> Self {
        self.cache = Some(Box::new(sender));
        self
    }

    pub fn with_markdown(
        mut self,
        sender: impl Sender<MarkdownRequest, MarkdownResponse> + 'static,
    ) -> Self {
        self.markdown = Some(Box::new(sender));
        self
    }

    /// Replaces the evaluator used for query requests.
    pub fn with_query_evaluator(mut self, evaluator: impl QueryEvaluator + 'static) -> Self {
        self.query = Some(Box::new(evaluator));
        self
    }
}

/// Runs `filter` over every JSON document in `json`, concatenating results.
///
/// `json` may hold any number of whitespace-separated documents. A document
/// that fails to parse aborts the run.
pub fn run_query(
    evaluator: &dyn QueryEvaluator,
    json: &str,
    filter: &str,
) -> std::result::Result<Vec<String>, SendError> {
    let mut results = Vec::new();
    let documents = Deserializer::from_str(json).into_iter::<Value>();
    for (index, document) in documents.enumerate() {
        let document = document.map_err(|e| {
            SendError::new(format!("parse JSON document {}", index + 1)).with_source(e)
        })?;
        results.extend(evaluator.evaluate(filter, &document)?);
    }
    Ok(results)
}

/// Executes stored requests and records their history.
pub struct Dispatcher<F: FileSystem> {
    store: Arc<Store<F>>,
    senders: Senders,
}

impl<F: FileSystem> fmt::Debug for Dispatcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("senders", &self.senders)
            .finish_non_exhaustive()
    }
}

impl<F: FileSystem> Dispatcher<F> {
    pub fn new(store: Arc<Store<F>>, senders: Senders) -> Self {
        Self { store, senders }
    }

    pub fn store(&self) -> &Arc<Store<F>> {
        &self.store
    }

    /// Executes the request stored at `id` and appends the outcome to its
    /// history.
    ///
    /// `sent_at` is taken just before the sender is called and `received_at`
    /// just after it returns. A failed send writes no history.
    ///
    /// # Returns
    ///
    /// The appended history entry.
    ///
    /// # Errors
    ///
    /// - Any error of [`Store::get`] while loading the request
    /// - [`Error::UnsupportedKind`] if no sender is installed for its kind
    /// - [`Error::Send`] if the sender fails
    /// - Any error of [`Store::append_history`]
    pub fn perform(&self, id: &RequestId) -> Result<HistoryEntry> {
        let request = self.store.get(id)?;
        debug!("perform {} ({})", id, request.data.kind());

        let sent_at = Utc::now();
        let response = self.send(id, &request.data)?;
        let received_at = Utc::now();

        let entry = HistoryEntry {
            sent_at,
            received_at,
            request: request.data,
            response,
        };
        self.store.append_history(id, &entry)?;

        info!(
            "performed {} ({}) in {}ms",
            id,
            entry.request.kind(),
            entry.elapsed().num_milliseconds()
        );
        Ok(entry)
    }

    /// Like [`Dispatcher::perform`], returning the response as a JSON object
    /// with its `kind` tag, the form shown to users.
    pub fn perform_tagged(&self, id: &RequestId) -> Result<Value> {
        let entry = self.perform(id)?;
        codec::encode_response(&entry.response).map_err(|source| Error::Encode {
            op: Operation::Perform,
            id: id.to_string(),
            source,
        })
    }

    /// Runs a query filter over `json` without touching the store.
    pub fn evaluate_query(&self, json: &str, filter: &str) -> std::result::Result<Vec<String>, SendError> {
        let evaluator = self
            .senders
            .query
            .as_deref()
            .ok_or_else(|| SendError::new("no query evaluator installed"))?;
        run_query(evaluator, json, filter)
    }

    fn send(&self, id: &RequestId, data: &RequestData) -> Result<ResponseData> {
        let op = Operation::Perform;
        let unsupported = || Error::UnsupportedKind {
            op,
            id: id.to_string(),
            kind: data.kind(),
        };
        let failed = |source| Error::Send {
            op,
            id: id.to_string(),
            source,
        };

        let senders = &self.senders;
        match data {
            RequestData::Http(req) => {
                let sender = senders.http.as_deref().ok_or_else(unsupported)?;
                sender.send(req).map(Into::into).map_err(failed)
            }
            RequestData::Sql(req) => {
                let sender = senders.sql.as_deref().ok_or_else(unsupported)?;
                sender.send(req).map(Into::into).map_err(failed)
            }
            RequestData::Grpc(req) => {
                let sender = senders.grpc.as_deref().ok_or_else(unsupported)?;
                sender.send(req).map(Into::into).map_err(failed)
            }
            RequestData::Cache(req) => {
                let sender = senders.cache.as_deref().ok_or_else(unsupported)?;
                sender.send(req).map(Into::into).map_err(failed)
            }
            RequestData::Markdown(req) => {
                let sender = senders.markdown.as_deref().ok_or_else(unsupported)?;
                sender.send(req).map(Into::into).map_err(failed)
            }
            RequestData::Query(req) => {
                let evaluator = senders.query.as_deref().ok_or_else(unsupported)?;
                run_query(evaluator, &req.json, &req.query)
                    .map(|response| QueryResponse { response }.into())
                    .map_err(failed)
            }
        }
    }
}
