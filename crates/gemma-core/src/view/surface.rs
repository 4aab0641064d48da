//! Keyed display nodes grouped in named containers

use std::collections::{BTreeMap, HashMap};

/// Container ids the renderer writes into
pub mod containers {
    pub const COUNT: &str = "gemma-count";
    pub const FILTER_SUMMARY: &str = "gemma-filter-summary";
    pub const CONTROLS: &str = "gemma-controls";
    pub const STATUS: &str = "gemma-status";
    pub const PROGRESS: &str = "gemma-progress";
    pub const RESULTS: &str = "gemma-results";
    pub const SUMMARY: &str = "gemma-summary";
    pub const BROWSE: &str = "gemma-browse";
    pub const ARCHIVE: &str = "gemma-archive";
    pub const PREVIEW: &str = "gemma-preview";
    pub const CHAT: &str = "gemma-chat";
    pub const LOG: &str = "gemma-log";
    pub const TOASTS: &str = "gemma-toasts";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Button,
    Progress,
    Card,
    Row,
    Notice,
    Message,
}

/// One keyed element
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub key: String,
    pub kind: NodeKind,
    pub text: String,
    pub attrs: BTreeMap<String, String>,
}

impl ViewNode {
    pub fn new(key: impl Into<String>, kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            text: text.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Where rendered nodes end up
///
/// Keys are unique within a container, so repeating a render never duplicates
/// a node.
pub trait ViewSurface: Send {
    /// Replace the node with the same key in place, or append it
    fn upsert(&mut self, container: &str, node: ViewNode);

    /// Append unless a node with the same key exists. Returns whether it was added.
    fn append(&mut self, container: &str, node: ViewNode) -> bool;

    /// Returns whether a node was removed
    fn remove(&mut self, container: &str, key: &str) -> bool;

    fn clear(&mut self, container: &str);
}

/// In-memory surface
///
/// `revision` counts effective mutations, which makes "nothing changed"
/// observable.
#[derive(Debug, Default, Clone)]
pub struct NodeTree {
    containers: HashMap<String, Vec<ViewNode>>,
    revision: u64,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn children(&self, container: &str) -> &[ViewNode] {
        self.containers
            .get(container)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, container: &str, key: &str) -> Option<&ViewNode> {
        self.children(container).iter().find(|n| n.key == key)
    }

    /// Text of the node with `key`, if present
    pub fn text(&self, container: &str, key: &str) -> Option<&str> {
        self.get(container, key).map(|n| n.text.as_str())
    }

    pub fn keys(&self, container: &str) -> Vec<&str> {
        self.children(container)
            .iter()
            .map(|n| n.key.as_str())
            .collect()
    }
}

impl ViewSurface for NodeTree {
    fn upsert(&mut self, container: &str, node: ViewNode) {
        let nodes = self.containers.entry(container.to_string()).or_default();
        match nodes.iter_mut().find(|n| n.key == node.key) {
            Some(existing) if *existing == node => return,
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
        self.revision += 1;
    }

    fn append(&mut self, container: &str, node: ViewNode) -> bool {
        let nodes = self.containers.entry(container.to_string()).or_default();
        if nodes.iter().any(|n| n.key == node.key) {
            return false;
        }
        nodes.push(node);
        self.revision += 1;
        true
    }

    fn remove(&mut self, container: &str, key: &str) -> bool {
        let Some(nodes) = self.containers.get_mut(container) else {
            return false;
        };
        let before = nodes.len();
        nodes.retain(|n| n.key != key);
        let removed = nodes.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    fn clear(&mut self, container: &str) {
        if let Some(nodes) = self.containers.get_mut(container) {
            if !nodes.is_empty() {
                nodes.clear();
                self.revision += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut tree = NodeTree::new();
        tree.upsert("c", ViewNode::new("a", NodeKind::Text, "one"));
        tree.upsert("c", ViewNode::new("b", NodeKind::Text, "two"));
        tree.upsert("c", ViewNode::new("a", NodeKind::Text, "three"));

        assert_eq!(tree.keys("c"), vec!["a", "b"]);
        assert_eq!(tree.text("c", "a"), Some("three"));
    }

    #[test]
    fn test_identical_writes_do_not_bump_revision() {
        let mut tree = NodeTree::new();
        tree.upsert("c", ViewNode::new("a", NodeKind::Text, "one"));
        let revision = tree.revision();

        tree.upsert("c", ViewNode::new("a", NodeKind::Text, "one"));
        assert!(!tree.append("c", ViewNode::new("a", NodeKind::Text, "other")));
        assert!(!tree.remove("c", "missing"));
        tree.clear("empty");
        assert_eq!(tree.revision(), revision);
    }
}
