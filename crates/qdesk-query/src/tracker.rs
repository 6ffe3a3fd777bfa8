//! Query execution tracker

use parking_lot::RwLock;
use qdesk_core::{Result, SharedResultSet, SqlEndpoint, TableRef, sql};
use std::time::{Duration, Instant};

use crate::mode::QueryMode;
use crate::slot::{ResultSlot, SlotKind, SlotOrdering, SlotSnapshot};

/// What a successful request did to its slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    /// The response is now the slot's payload
    Applied(SharedResultSet),
    /// A newer response was already shown, or the tracker was reset
    Superseded,
}

impl SlotUpdate {
    pub fn payload(&self) -> Option<&SharedResultSet> {
        match self {
            SlotUpdate::Applied(payload) => Some(payload),
            SlotUpdate::Superseded => None,
        }
    }
}

#[derive(Default)]
struct Slots {
    preview: ResultSlot,
    describe: ResultSlot,
    query: ResultSlot,
    /// Bumped by `reset`; responses to older requests are dropped
    generation: u64,
    mode: QueryMode,
}

impl Slots {
    fn get(&self, kind: SlotKind) -> &ResultSlot {
        match kind {
            SlotKind::Preview => &self.preview,
            SlotKind::Describe => &self.describe,
            SlotKind::Query => &self.query,
        }
    }

    fn get_mut(&mut self, kind: SlotKind) -> &mut ResultSlot {
        match kind {
            SlotKind::Preview => &mut self.preview,
            SlotKind::Describe => &mut self.describe,
            SlotKind::Query => &mut self.query,
        }
    }
}

/// Tracks the preview, describe and ad-hoc query slots
///
/// Requests are never cancelled. Each one issues exactly one remote call;
/// the slot's payload changes only when a call succeeds.
pub struct QueryTracker {
    slots: RwLock<Slots>,
    ordering: SlotOrdering,
    min_fetch_duration: Duration,
}

impl QueryTracker {
    pub fn new(ordering: SlotOrdering) -> Self {
        Self::with_min_fetch_duration(ordering, Duration::ZERO)
    }

    /// Create a tracker that pads every request to at least `min_fetch_duration`
    pub fn with_min_fetch_duration(ordering: SlotOrdering, min_fetch_duration: Duration) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            ordering,
            min_fetch_duration,
        }
    }

    pub fn ordering(&self) -> SlotOrdering {
        self.ordering
    }

    /// Fetch every row of `table` into the preview slot
    pub async fn preview(
        &self,
        endpoint: &dyn SqlEndpoint,
        connection_id: &str,
        table: &TableRef,
    ) -> Result<SlotUpdate> {
        self.execute(SlotKind::Preview, endpoint, connection_id, &sql::select_all(table))
            .await
    }

    /// Fetch the structure of `table` into the describe slot
    pub async fn describe(
        &self,
        endpoint: &dyn SqlEndpoint,
        connection_id: &str,
        table: &TableRef,
    ) -> Result<SlotUpdate> {
        self.execute(SlotKind::Describe, endpoint, connection_id, &sql::describe(table))
            .await
    }

    /// Run `sql_text` as given into the query slot
    pub async fn run_query(
        &self,
        endpoint: &dyn SqlEndpoint,
        connection_id: &str,
        sql_text: &str,
    ) -> Result<SlotUpdate> {
        self.execute(SlotKind::Query, endpoint, connection_id, sql_text)
            .await
    }

    #[tracing::instrument(
        skip(self, endpoint, sql_text),
        fields(sql_preview = %sql_text.chars().take(50).collect::<String>())
    )]
    async fn execute(
        &self,
        slot: SlotKind,
        endpoint: &dyn SqlEndpoint,
        connection_id: &str,
        sql_text: &str,
    ) -> Result<SlotUpdate> {
        let (seq, generation) = {
            let mut slots = self.slots.write();
            let seq = slots.get_mut(slot).begin();
            (seq, slots.generation)
        };
        let _guard = InFlightGuard {
            tracker: self,
            slot,
        };
        tracing::debug!(seq, "dispatching");

        let started = Instant::now();
        let result = match endpoint.query_first(connection_id, sql_text).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(seq, error = %e, "query failed, keeping previous payload");
                return Err(e);
            }
        };
        let remaining = self.min_fetch_duration.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }

        let mut slots = self.slots.write();
        if slots.generation != generation {
            tracing::debug!(seq, "tracker was reset, dropping response");
            return Ok(SlotUpdate::Superseded);
        }
        match slots.get_mut(slot).apply(seq, result, self.ordering) {
            Some(payload) => {
                tracing::debug!(seq, rows = payload.row_count(), "slot updated");
                Ok(SlotUpdate::Applied(payload))
            }
            None => {
                tracing::debug!(seq, "newer response already shown, dropping");
                Ok(SlotUpdate::Superseded)
            }
        }
    }

    /// Empty the preview and describe payloads
    pub fn clear_preview(&self) {
        let mut slots = self.slots.write();
        slots.preview.clear();
        slots.describe.clear();
    }

    /// Empty every slot and drop responses to requests already in flight
    pub fn reset(&self) {
        let mut slots = self.slots.write();
        slots.generation += 1;
        slots.preview.clear();
        slots.describe.clear();
        slots.query.clear();
    }

    pub fn slot(&self, kind: SlotKind) -> SlotSnapshot {
        self.slots.read().get(kind).snapshot()
    }

    pub fn is_loading(&self, kind: SlotKind) -> bool {
        self.slot(kind).loading
    }

    pub fn mode(&self) -> QueryMode {
        self.slots.read().mode
    }

    pub fn set_mode(&self, mode: QueryMode) {
        self.slots.write().mode = mode;
    }
}

impl Default for QueryTracker {
    fn default() -> Self {
        Self::new(SlotOrdering::default())
    }
}

struct InFlightGuard<'a> {
    tracker: &'a QueryTracker,
    slot: SlotKind,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tracker.slots.write().get_mut(self.slot).finish();
    }
}
