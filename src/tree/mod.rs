//! Expression tree data model
//!
//! A parsed expression is an arena of [`ExpressionNode`]s owned by an
//! [`ExpressionTree`] together with the original source string. Nodes
//! address each other by index, which lets the builder rewrite a node in
//! place (turning a value into an operator wrapper) without fighting over
//! ownership. Orphaned arena slots left behind by rewriting are ignored by
//! everything that walks from the root.

mod node;

pub use node::{ExpressionNode, NodeId, NodeType, OperatorType};

use std::hash::{Hash, Hasher};

/// A parsed filter expression: source text plus node arena.
///
/// Immutable once returned from the parser. Equality and hashing consider
/// the source text and the structure reachable from the root, so two
/// independent parses of the same text compare equal.
#[derive(Debug, Clone)]
pub struct ExpressionTree {
    pub(crate) source: String,
    pub(crate) nodes: Vec<ExpressionNode>,
    pub(crate) root: Option<NodeId>,
}

impl ExpressionTree {
    pub(crate) fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
            root: None,
        }
    }

    /// The original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root node index, `None` for an empty expression
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ExpressionNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ExpressionNode {
        &mut self.nodes[id]
    }

    /// Append a node to the arena and return its index
    pub(crate) fn push(&mut self, node: ExpressionNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append `child` to `parent`'s child list and set its back-reference
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    /// The text a node stands for: its decoded form when escapes were
    /// processed, otherwise the trimmed source span.
    pub fn text(&self, id: NodeId) -> &str {
        let node = &self.nodes[id];
        if let Some(formatted) = &node.formatted_text {
            return formatted;
        }
        match node.end {
            Some(end) if end >= node.start => self.source[node.start..=end].trim(),
            _ => "",
        }
    }

    fn node_eq(&self, a: NodeId, other: &Self, b: NodeId) -> bool {
        let left = &self.nodes[a];
        let right = &other.nodes[b];
        left.node_type == right.node_type
            && left.operator == right.operator
            && left.locked == right.locked
            && left.start == right.start
            && left.end == right.end
            && left.formatted_text == right.formatted_text
            && left.children.len() == right.children.len()
            && left
                .children
                .iter()
                .zip(right.children.iter())
                .all(|(&l, &r)| self.node_eq(l, other, r))
    }

    fn hash_node<H: Hasher>(&self, id: NodeId, state: &mut H) {
        let node = &self.nodes[id];
        node.node_type.hash(state);
        node.operator.hash(state);
        node.start.hash(state);
        node.end.hash(state);
        node.formatted_text.hash(state);
        node.children.len().hash(state);
        for &child in &node.children {
            self.hash_node(child, state);
        }
    }
}

impl PartialEq for ExpressionTree {
    fn eq(&self, other: &Self) -> bool {
        if self.source != other.source {
            return false;
        }
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => self.node_eq(a, other, b),
            _ => false,
        }
    }
}

impl Eq for ExpressionTree {}

impl Hash for ExpressionTree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        if let Some(root) = self.root {
            self.hash_node(root, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_extraction() {
        let mut tree = ExpressionTree::new("[Value] > 10");
        let id = tree.push(ExpressionNode::with_span(NodeType::Property, 0, 6));
        assert_eq!(tree.text(id), "[Value]");
    }

    #[test]
    fn test_formatted_text_wins() {
        let mut tree = ExpressionTree::new("'a''b'");
        let id = tree.push(ExpressionNode::with_span(NodeType::Str, 0, 5));
        tree.node_mut(id).formatted_text = Some("'a'b'".to_string());
        assert_eq!(tree.text(id), "'a'b'");
    }

    #[test]
    fn test_unset_end_yields_empty_text() {
        let mut tree = ExpressionTree::new("abc");
        let id = tree.push(ExpressionNode::new(NodeType::Unknown, 0));
        assert_eq!(tree.text(id), "");
    }
}
