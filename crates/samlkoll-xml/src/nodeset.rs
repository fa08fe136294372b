#![forbid(unsafe_code)]

//! NodeSet type for XML canonicalization and transforms.
//!
//! A `NodeSet` is a document subset identified by roxmltree `NodeId`s. It
//! covers element, text, comment and processing-instruction nodes;
//! attributes and namespace nodes follow their owning element.

use roxmltree::{Document, Node, NodeId};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node set containing all nodes in the document.
    pub fn all(doc: &Document<'_>) -> Self {
        Self {
            nodes: doc.descendants().map(|n| n.id()).collect(),
        }
    }

    /// Create a node set containing all nodes except comments.
    /// `URI=""` selects the document without comments.
    pub fn all_without_comments(doc: &Document<'_>) -> Self {
        Self {
            nodes: doc
                .descendants()
                .filter(|n| !n.is_comment())
                .map(|n| n.id())
                .collect(),
        }
    }

    /// Create a node set for a subtree rooted at the given node (without comments).
    /// This is what a `#id` reference selects.
    pub fn tree_without_comments(root: Node<'_, '_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root, &mut nodes, false);
        Self { nodes }
    }

    /// Create a node set for a subtree rooted at the given node (with comments).
    pub fn tree_with_comments(root: Node<'_, '_>) -> Self {
        let mut nodes = HashSet::new();
        collect_subtree(root, &mut nodes, true);
        Self { nodes }
    }

    /// Check if a node is in this set.
    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    /// Check if a node ID is in this set.
    pub fn contains_id(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Add a node to this set.
    pub fn insert(&mut self, node: &Node<'_, '_>) {
        self.nodes.insert(node.id());
    }

    /// Remove every node of the subtree rooted at `root`.
    pub fn remove_subtree(&mut self, root: Node<'_, '_>) {
        for d in root.descendants() {
            self.nodes.remove(&d.id());
        }
    }

    /// Remove comment nodes from this set.
    pub fn without_comments(mut self, doc: &Document<'_>) -> Self {
        for n in doc.descendants().filter(|n| n.is_comment()) {
            self.nodes.remove(&n.id());
        }
        self
    }

    /// Compute the intersection of two node sets.
    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.intersection(&other.nodes).copied().collect(),
        }
    }

    /// Check if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn collect_subtree(node: Node<'_, '_>, set: &mut HashSet<NodeId>, include_comments: bool) {
    if !include_comments && node.is_comment() {
        return;
    }
    set.insert(node.id());
    for child in node.children() {
        collect_subtree(child, set, include_comments);
    }
}
