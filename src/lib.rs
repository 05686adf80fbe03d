//! Impulse: storage and execution core of an API-request workbench.
//!
//! Users author requests of several kinds (HTTP, SQL, gRPC, cache commands,
//! JSON queries and Markdown documents). Each request is stored as a JSON
//! definition file next to an append-only JSONL history log, and every
//! execution adds one record to that log.
//!
//! # Architecture
//!
//! - **models**: Request and response variants per kind, ids, history entries
//! - **registry**: The table of known kinds and their decoders
//! - **codec**: Tagged (de)serialization of definitions and history lines
//! - **fs**: The filesystem seam (`OsFileSystem`, `MemoryFileSystem`)
//! - **store**: The tree of requests on disk, with history appends
//! - **dispatcher**: Routes a stored request to its sender and records the result
//! - **query**: Built-in evaluator for JSON query requests
//! - **config**: Settings loading and validation
//! - **senders**: Network senders (`native` feature)
//!
//! # Usage
//!
//! ```no_run
//! use impulse::config::load_config;
//! use impulse::dispatcher::{Dispatcher, SendError, Senders};
//! use impulse::models::{HttpRequest, HttpResponse, RequestId};
//! use impulse::store::Store;
//! use std::sync::Arc;
//!
//! let config = load_config(None).unwrap();
//! let store = Arc::new(Store::open(&config).unwrap());
//!
//! let id = RequestId::parse("users/list").unwrap();
//! let request = HttpRequest {
//!     url: "https://api.example.com/users".to_string(),
//!     ..HttpRequest::default()
//! };
//! store.create(&id, &request.into()).unwrap();
//!
//! let senders = Senders::default().with_http(|_: &HttpRequest| {
//!     Ok::<_, SendError>(HttpResponse {
//!         code: 200,
//!         body: "[]".to_string(),
//!         headers: vec![],
//!     })
//! });
//! let dispatcher = Dispatcher::new(Arc::clone(&store), senders);
//! let entry = dispatcher.perform(&id).unwrap();
//! assert!(entry.sent_at <= entry.received_at);
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fs;
pub mod models;
pub mod query;
pub mod registry;
#[cfg(feature = "native")]
pub mod senders;
pub mod store;

pub use config::WorkbenchConfig;
pub use dispatcher::{Dispatcher, QueryEvaluator, SendError, Sender, Senders};
pub use error::{Error, Operation, Result};
pub use models::{HistoryEntry, Kind, Request, RequestData, RequestId, ResponseData, Tree};
pub use registry::KindRegistry;
pub use store::Store;
