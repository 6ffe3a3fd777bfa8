//! Arena holding the schema forest

use qdesk_core::{QdeskError, Result};
use slotmap::SlotMap;

use crate::node::{Children, NodeKey, NodeKind, SchemaNode, SchemaNodeView};

/// Schema forest: databases at the root, tables below, columns as leaves
///
/// Nodes live in a `SlotMap` so merges address them by key. Replacing a
/// node's children removes the old subtree, so keys into it stop resolving.
#[derive(Debug, Default)]
pub struct SchemaTree {
    nodes: SlotMap<NodeKey, SchemaNode>,
    roots: Vec<NodeKey>,
}

impl SchemaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole forest with one schema node per name
    pub fn replace_roots<I, S>(&mut self, names: I) -> Vec<NodeKey>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clear();
        let keys: Vec<NodeKey> = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                self.insert(None, name.clone(), name, NodeKind::Schema, None)
            })
            .collect();
        self.roots = keys.clone();
        keys
    }

    /// Replace the children of `parent`
    ///
    /// Each child is `(name, data_type)`. The previous children, and anything
    /// below them, are discarded. Column nodes cannot have children.
    pub fn set_children<I>(&mut self, parent: NodeKey, children: I) -> Result<Vec<NodeKey>>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let (parent_id, child_kind, old) = {
            let node = self
                .nodes
                .get(parent)
                .ok_or_else(|| QdeskError::InvalidNode("node no longer exists".into()))?;
            let child_kind = node.kind.child_kind().ok_or_else(|| {
                QdeskError::InvalidNode(format!("{} '{}' has no children", node.kind, node.id))
            })?;
            (node.id.clone(), child_kind, node.children.keys().to_vec())
        };

        for key in old {
            self.remove_subtree(key);
        }

        let keys: Vec<NodeKey> = children
            .into_iter()
            .map(|(name, data_type)| {
                let id = format!("{}.{}", parent_id, name);
                self.insert(Some(parent), id, name, child_kind, data_type)
            })
            .collect();

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children = Children::Fetched(keys.clone());
        }
        Ok(keys)
    }

    pub fn get(&self, key: NodeKey) -> Option<&SchemaNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Look a node up by its dotted id
    pub fn find(&self, id: &str) -> Option<NodeKey> {
        // Table names may contain dots, so fall back to a full scan when the
        // segment walk fails.
        self.find_by_path(id).or_else(|| {
            self.nodes
                .iter()
                .find(|(_, node)| node.id == id)
                .map(|(key, _)| key)
        })
    }

    fn find_by_path(&self, id: &str) -> Option<NodeKey> {
        let mut parts = id.split('.');
        let mut key = self.child_named(&self.roots, parts.next()?)?;
        for part in parts {
            key = self.child_named(self.nodes.get(key)?.children.keys(), part)?;
        }
        Some(key)
    }

    fn child_named(&self, keys: &[NodeKey], name: &str) -> Option<NodeKey> {
        keys.iter()
            .copied()
            .find(|k| self.nodes.get(*k).is_some_and(|n| n.name == name))
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Child nodes of `key` in remote order
    pub fn children(&self, key: NodeKey) -> Vec<&SchemaNode> {
        self.nodes
            .get(key)
            .map(|node| {
                node.children
                    .keys()
                    .iter()
                    .filter_map(|k| self.nodes.get(*k))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    /// Nested copy of the whole forest
    pub fn view(&self) -> Vec<SchemaNodeView> {
        self.roots.iter().filter_map(|k| self.view_of(*k)).collect()
    }

    pub fn view_of(&self, key: NodeKey) -> Option<SchemaNodeView> {
        let node = self.nodes.get(key)?;
        let children = match &node.children {
            Children::Unfetched => None,
            Children::Fetched(keys) => {
                Some(keys.iter().filter_map(|k| self.view_of(*k)).collect())
            }
        };
        Some(SchemaNodeView {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            data_type: node.data_type.clone(),
            children,
        })
    }

    fn insert(
        &mut self,
        parent: Option<NodeKey>,
        id: String,
        name: String,
        kind: NodeKind,
        data_type: Option<String>,
    ) -> NodeKey {
        self.nodes.insert_with_key(|key| SchemaNode {
            key,
            id,
            name,
            kind,
            parent,
            children: Children::Unfetched,
            data_type,
        })
    }

    fn remove_subtree(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.remove(key) {
            for child in node.children.keys() {
                self.remove_subtree(*child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tables(names: &[&str]) -> Vec<(String, Option<String>)> {
        names.iter().map(|n| (n.to_string(), None)).collect()
    }

    #[test]
    fn test_replace_roots_builds_schema_nodes() {
        let mut tree = SchemaTree::new();
        let keys = tree.replace_roots(["app", "mysql"]);

        assert_eq!(keys.len(), 2);
        let app = tree.get(keys[0]).unwrap();
        assert_eq!(app.id, "app");
        assert_eq!(app.kind, NodeKind::Schema);
        assert!(!app.children.is_fetched());
    }

    #[test]
    fn test_set_children_builds_dotted_ids_in_order() {
        let mut tree = SchemaTree::new();
        let roots = tree.replace_roots(["shop"]);
        let table_keys = tree.set_children(roots[0], tables(&["orders", "customers"])).unwrap();

        let names: Vec<_> = tree.children(roots[0]).iter().map(|n| n.id.clone()).collect();
        assert_eq!(names, vec!["shop.orders", "shop.customers"]);

        let cols = tree
            .set_children(table_keys[0], vec![("id".to_string(), Some("int(11)".to_string()))])
            .unwrap();
        let col = tree.get(cols[0]).unwrap();
        assert_eq!(col.id, "shop.orders.id");
        assert_eq!(col.kind, NodeKind::Column);
        assert_eq!(col.data_type.as_deref(), Some("int(11)"));
        assert_eq!(col.parent, Some(table_keys[0]));
    }

    #[test]
    fn test_set_children_replaces_previous_subtree() {
        let mut tree = SchemaTree::new();
        let roots = tree.replace_roots(["shop"]);
        let first = tree.set_children(roots[0], tables(&["orders"])).unwrap();
        tree.set_children(first[0], tables(&["id"])).unwrap();
        assert_eq!(tree.len(), 3);

        let second = tree.set_children(roots[0], tables(&["orders", "items"])).unwrap();
        assert_eq!(tree.len(), 3);
        assert!(!tree.contains(first[0]));
        assert!(!tree.get(second[0]).unwrap().children.is_fetched());
    }

    #[test]
    fn test_empty_fetch_marks_fetched() {
        let mut tree = SchemaTree::new();
        let roots = tree.replace_roots(["empty_db"]);
        tree.set_children(roots[0], Vec::new()).unwrap();
        assert!(tree.get(roots[0]).unwrap().children.is_fetched());
        assert!(tree.children(roots[0]).is_empty());
    }

    #[test]
    fn test_columns_have_no_children() {
        let mut tree = SchemaTree::new();
        let roots = tree.replace_roots(["shop"]);
        let t = tree.set_children(roots[0], tables(&["orders"])).unwrap();
        let c = tree.set_children(t[0], tables(&["id"])).unwrap();

        let result = tree.set_children(c[0], tables(&["nope"]));
        assert!(matches!(result, Err(QdeskError::InvalidNode(_))));
    }

    #[test]
    fn test_keys_do_not_survive_root_replacement() {
        let mut tree = SchemaTree::new();
        let old = tree.replace_roots(["app"]);
        let new = tree.replace_roots(["app"]);

        assert!(!tree.contains(old[0]));
        assert!(tree.contains(new[0]));
        assert!(tree.set_children(old[0], tables(&["t"])).is_err());
    }

    #[test]
    fn test_find_by_id() {
        let mut tree = SchemaTree::new();
        let roots = tree.replace_roots(["shop", "crm"]);
        let t = tree.set_children(roots[0], tables(&["orders", "logs.2024"])).unwrap();
        let c = tree.set_children(t[0], tables(&["id"])).unwrap();

        assert_eq!(tree.find("crm"), Some(roots[1]));
        assert_eq!(tree.find("shop.orders"), Some(t[0]));
        assert_eq!(tree.find("shop.orders.id"), Some(c[0]));
        assert_eq!(tree.find("shop.logs.2024"), Some(t[1]));
        assert_eq!(tree.find("shop.missing"), None);
        assert_eq!(tree.find("nowhere"), None);
    }

    #[test]
    fn test_view_distinguishes_unfetched_from_empty() {
        let mut tree = SchemaTree::new();
        let roots = tree.replace_roots(["a", "b"]);
        tree.set_children(roots[1], Vec::new()).unwrap();

        let view = tree.view();
        assert_eq!(view[0].children, None);
        assert_eq!(view[1].children, Some(Vec::new()));
    }
}
