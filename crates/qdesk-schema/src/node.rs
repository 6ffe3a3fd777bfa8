//! Schema tree nodes

use serde::Serialize;
use std::fmt;

slotmap::new_key_type! {
    /// Stable key of a node within one tree
    ///
    /// Keys are never reused: once a node is discarded (re-fetch of its
    /// parent, root reload, disconnect) its key stops resolving.
    pub struct NodeKey;
}

/// Level of a node in the schema tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Schema,
    Table,
    Column,
}

impl NodeKind {
    /// Kind of this node's children; columns are leaves
    pub fn child_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Schema => Some(NodeKind::Table),
            NodeKind::Table => Some(NodeKind::Column),
            NodeKind::Column => None,
        }
    }

    /// Upper-case label shown next to completion candidates
    pub fn detail(self) -> &'static str {
        match self {
            NodeKind::Schema => "SCHEMA",
            NodeKind::Table => "TABLE",
            NodeKind::Column => "COLUMN",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Schema => write!(f, "schema"),
            NodeKind::Table => write!(f, "table"),
            NodeKind::Column => write!(f, "column"),
        }
    }
}

/// Children of a node: either never fetched or fully fetched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Children {
    #[default]
    Unfetched,
    Fetched(Vec<NodeKey>),
}

impl Children {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Children::Fetched(_))
    }

    /// Child keys in remote result order, empty when unfetched
    pub fn keys(&self) -> &[NodeKey] {
        match self {
            Children::Unfetched => &[],
            Children::Fetched(keys) => keys,
        }
    }
}

/// A schema, table or column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    pub key: NodeKey,

    /// Dot-joined path: `db`, `db.table`, `db.table.column`
    pub id: String,

    pub name: String,

    pub kind: NodeKind,

    pub parent: Option<NodeKey>,

    pub children: Children,

    /// Declared type, columns only
    pub data_type: Option<String>,
}

/// Owned, nested copy of a subtree for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaNodeView {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// `None` until the node has been expanded
    pub children: Option<Vec<SchemaNodeView>>,
}
