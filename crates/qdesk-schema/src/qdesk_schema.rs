//! qdesk Schema - Lazily materialized schema tree and completion index
//!
//! This crate provides:
//! - `SchemaTree`, an arena of schema → table → column nodes addressed by
//!   stable `NodeKey`s
//! - `CompletionIndex`, the flat autocomplete corpus derived from the tree
//! - `SchemaLoader`, which fetches tree levels on demand and merges results
//!   into both

mod completion;
mod loader;
mod node;
mod tree;

pub use completion::{CompletionEntry, CompletionIndex};
pub use loader::{FetchOutcome, SchemaLoader};
pub use node::{Children, NodeKey, NodeKind, SchemaNode, SchemaNodeView};
pub use tree::SchemaTree;
