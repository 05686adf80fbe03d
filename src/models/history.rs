//! Execution history and the assembled request aggregate.

use super::{RequestData, RequestId, ResponseData};
use chrono::{DateTime, Utc};

/// One immutable record of a past execution.
///
/// Entries are appended to a request's history log and never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Captured immediately before the request was handed to its sender.
    pub sent_at: DateTime<Utc>,

    /// Captured immediately after the sender returned.
    pub received_at: DateTime<Utc>,

    /// The exact request that was sent.
    pub request: RequestData,

    /// The response that came back.
    pub response: ResponseData,
}

impl HistoryEntry {
    /// Returns how long the execution took.
    pub fn elapsed(&self) -> chrono::Duration {
        self.received_at - self.sent_at
    }
}

/// A stored request: its id, current definition and full history.
///
/// Returned values are independent copies; changing them does not touch the
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub data: RequestData,
    /// Oldest first, in write order.
    pub history: Vec<HistoryEntry>,
}
