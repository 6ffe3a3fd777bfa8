//! Autocomplete corpus derived from the schema tree

use serde::Serialize;

use crate::node::NodeKind;

/// One autocomplete candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub label: String,
    pub insert_text: String,
    /// `SCHEMA`, `TABLE` or `COLUMN`
    pub detail: String,
    pub kind: NodeKind,
}

impl CompletionEntry {
    /// Candidate for a tree node named `name`
    pub fn for_node(name: impl Into<String>, kind: NodeKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            insert_text: name,
            detail: kind.detail().to_string(),
            kind,
        }
    }
}

/// Flat, append-only list of candidates
///
/// Entries are never de-duplicated; expanding the same node twice yields its
/// children twice. Filtering is left to consumers.
#[derive(Debug, Clone, Default)]
pub struct CompletionIndex {
    entries: Vec<CompletionEntry>,
}

impl CompletionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entries: impl IntoIterator<Item = CompletionEntry>) {
        self.entries.extend(entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[CompletionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
