//! Result slots

use chrono::{DateTime, Utc};
use qdesk_core::{ResultSet, SharedResultSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Policy for responses that complete out of order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOrdering {
    /// The last response to arrive wins, even if it answers an older request
    #[default]
    ArrivalOrder,
    /// A response older than the one already shown is discarded
    IssueOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Preview,
    Describe,
    Query,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Preview => write!(f, "preview"),
            SlotKind::Describe => write!(f, "describe"),
            SlotKind::Query => write!(f, "query"),
        }
    }
}

/// Point-in-time copy of a slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotSnapshot {
    /// True while at least one request for the slot is outstanding
    pub loading: bool,
    pub payload: Option<SharedResultSet>,
    /// Sequence number of the request whose payload is shown
    pub applied_seq: Option<u64>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub(crate) struct ResultSlot {
    in_flight: usize,
    next_seq: u64,
    applied_seq: Option<u64>,
    payload: Option<SharedResultSet>,
    completed_at: Option<DateTime<Utc>>,
}

impl ResultSlot {
    /// Register a dispatched request, returning its sequence number
    pub(crate) fn begin(&mut self) -> u64 {
        self.in_flight += 1;
        self.next_seq += 1;
        self.next_seq
    }

    /// Register a completed request, successful or not
    pub(crate) fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Store the result of request `seq` unless `ordering` rejects it
    pub(crate) fn apply(
        &mut self,
        seq: u64,
        result: ResultSet,
        ordering: SlotOrdering,
    ) -> Option<SharedResultSet> {
        if ordering == SlotOrdering::IssueOrder && self.applied_seq.is_some_and(|shown| seq < shown)
        {
            return None;
        }
        let payload = Arc::new(result);
        self.payload = Some(payload.clone());
        self.applied_seq = Some(seq);
        self.completed_at = Some(Utc::now());
        Some(payload)
    }

    /// Drop the payload; requests in flight are unaffected
    pub(crate) fn clear(&mut self) {
        self.payload = None;
        self.completed_at = None;
    }

    pub(crate) fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            loading: self.in_flight > 0,
            payload: self.payload.clone(),
            applied_seq: self.applied_seq,
            completed_at: self.completed_at,
        }
    }
}
