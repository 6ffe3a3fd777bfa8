//! On-demand loading of the schema tree
//!
//! Each fetch issues one query, waits for it without holding any lock, then
//! applies the result in a single short critical section. Results are merged
//! by `NodeKey`, so concurrent expansions of different nodes never interfere
//! and a response for a node that was discarded meanwhile is dropped.

use parking_lot::RwLock;
use qdesk_core::{QdeskError, Result, SqlEndpoint, TableRef, sql};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::completion::{CompletionEntry, CompletionIndex};
use crate::node::{NodeKey, NodeKind, SchemaNode, SchemaNodeView};
use crate::tree::SchemaTree;

/// Result of a fetch that reached the endpoint successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result was merged; keys of the new nodes in remote order
    Applied(Vec<NodeKey>),
    /// The tree was reset or the node discarded while the request was in flight
    Discarded,
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied(_))
    }
}

#[derive(Default)]
struct LoaderState {
    tree: SchemaTree,
    index: CompletionIndex,
    /// Bumped by `reset`; fetches started under an older generation are dropped
    generation: u64,
    root_loads: usize,
    expanding: HashMap<NodeKey, usize>,
}

/// Owns the schema tree and completion index and fills them lazily
pub struct SchemaLoader {
    state: RwLock<LoaderState>,
    min_fetch_duration: Duration,
}

impl SchemaLoader {
    /// Create a loader that pads every fetch to at least `min_fetch_duration`
    pub fn new(min_fetch_duration: Duration) -> Self {
        Self {
            state: RwLock::new(LoaderState::default()),
            min_fetch_duration,
        }
    }

    pub fn min_fetch_duration(&self) -> Duration {
        self.min_fetch_duration
    }

    /// Load the database list, replacing the whole tree and rebuilding the
    /// completion index
    #[tracing::instrument(skip(self, endpoint))]
    pub async fn load_root(
        &self,
        endpoint: &dyn SqlEndpoint,
        connection_id: &str,
    ) -> Result<FetchOutcome> {
        let generation = {
            let mut state = self.state.write();
            state.root_loads += 1;
            state.generation
        };
        let _guard = RootLoadGuard { loader: self };

        let started = Instant::now();
        let result = endpoint.query_first(connection_id, sql::SHOW_DATABASES).await?;
        self.pad(started).await;

        let names = result.flat_strings();
        let mut state = self.state.write();
        if state.generation != generation {
            tracing::debug!("tree was reset during root load, dropping result");
            return Ok(FetchOutcome::Discarded);
        }

        let keys = state.tree.replace_roots(names.iter().cloned());
        state.index.clear();
        state.index.append(
            names
                .into_iter()
                .map(|name| CompletionEntry::for_node(name, NodeKind::Schema)),
        );
        tracing::debug!(schemas = keys.len(), "loaded schema list");
        Ok(FetchOutcome::Applied(keys))
    }

    /// Fetch the children of a schema or table node
    ///
    /// On failure the node is left as it was and may be expanded again.
    #[tracing::instrument(skip(self, endpoint))]
    pub async fn expand(
        &self,
        endpoint: &dyn SqlEndpoint,
        connection_id: &str,
        key: NodeKey,
    ) -> Result<FetchOutcome> {
        let (node_id, kind, query, generation) = {
            let mut state = self.state.write();
            let node = state
                .tree
                .get(key)
                .ok_or_else(|| QdeskError::InvalidNode("node no longer exists".into()))?;
            let (node_id, kind) = (node.id.clone(), node.kind);
            let query = match kind {
                NodeKind::Schema => sql::show_tables(&node.name),
                NodeKind::Table => {
                    let schema = node
                        .parent
                        .and_then(|parent| state.tree.get(parent))
                        .ok_or_else(|| {
                            QdeskError::InvalidNode(format!("table '{}' has no schema", node_id))
                        })?;
                    sql::list_columns(&TableRef::new(schema.name.clone(), node.name.clone()))
                }
                NodeKind::Column => {
                    return Err(QdeskError::InvalidNode(format!(
                        "column '{}' cannot be expanded",
                        node_id
                    )));
                }
            };
            *state.expanding.entry(key).or_insert(0) += 1;
            (node_id, kind, query, state.generation)
        };
        let _guard = ExpandGuard { loader: self, key };

        tracing::debug!(node_id = %node_id, "expanding node");
        let started = Instant::now();
        let result = endpoint.query_first(connection_id, &query).await?;
        self.pad(started).await;

        let children: Vec<(String, Option<String>)> = match kind {
            NodeKind::Schema => result.flat_strings().into_iter().map(|t| (t, None)).collect(),
            _ => result.name_detail_pairs(),
        };
        let child_kind = kind.child_kind().unwrap_or(NodeKind::Column);

        let mut state = self.state.write();
        if state.generation != generation || !state.tree.contains(key) {
            tracing::debug!(node_id = %node_id, "node discarded while expanding, dropping result");
            return Ok(FetchOutcome::Discarded);
        }

        let entries: Vec<CompletionEntry> = children
            .iter()
            .map(|(name, _)| CompletionEntry::for_node(name.clone(), child_kind))
            .collect();
        let keys = state.tree.set_children(key, children)?;
        state.index.append(entries);
        tracing::debug!(node_id = %node_id, children = keys.len(), "expanded node");
        Ok(FetchOutcome::Applied(keys))
    }

    /// Discard the tree and the completion index
    ///
    /// Fetches still in flight are dropped when they complete.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.generation += 1;
        state.tree.clear();
        state.index.clear();
        tracing::debug!(generation = state.generation, "schema tree reset");
    }

    /// True while a root load is in flight
    pub fn tree_loading(&self) -> bool {
        self.state.read().root_loads > 0
    }

    /// True while an expansion of `key` is in flight
    pub fn is_expanding(&self, key: NodeKey) -> bool {
        self.state.read().expanding.contains_key(&key)
    }

    pub fn roots(&self) -> Vec<NodeKey> {
        self.state.read().tree.roots().to_vec()
    }

    pub fn node(&self, key: NodeKey) -> Option<SchemaNode> {
        self.state.read().tree.get(key).cloned()
    }

    /// Children of `key` in remote order
    pub fn children(&self, key: NodeKey) -> Vec<SchemaNode> {
        self.state
            .read()
            .tree
            .children(key)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<NodeKey> {
        self.state.read().tree.find(id)
    }

    /// Nested snapshot of the whole tree
    pub fn tree_view(&self) -> Vec<SchemaNodeView> {
        self.state.read().tree.view()
    }

    /// Snapshot of the completion index in append order
    pub fn completion_entries(&self) -> Vec<CompletionEntry> {
        self.state.read().index.entries().to_vec()
    }

    async fn pad(&self, started: Instant) {
        let remaining = self.min_fetch_duration.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new(Duration::from_millis(400))
    }
}

struct RootLoadGuard<'a> {
    loader: &'a SchemaLoader,
}

impl Drop for RootLoadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.loader.state.write();
        state.root_loads = state.root_loads.saturating_sub(1);
    }
}

struct ExpandGuard<'a> {
    loader: &'a SchemaLoader,
    key: NodeKey,
}

impl Drop for ExpandGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.loader.state.write();
        if let Some(count) = state.expanding.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                state.expanding.remove(&self.key);
            }
        }
    }
}
