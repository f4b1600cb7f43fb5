//! Tree normalization passes
//!
//! Two post-order passes run between scanning and compilation: end-index
//! propagation fills in the spans operator wrappers left open, and collapse
//! strips the synthetic grouping nodes parentheses leave behind. The
//! compiler assumes both have run.

use smallvec::SmallVec;

use crate::tree::{ExpressionTree, NodeId, NodeType, OperatorType};

pub(crate) fn normalize(tree: &mut ExpressionTree) {
    if let Some(root) = tree.root {
        propagate_end(tree, root);
        tree.root = collapse(tree, root, None);
    }
}

/// A node created as an operator wrapper before its second operand existed
/// has no end index; give it the maximum end among its children so every
/// span is fully determined once scanning completes.
fn propagate_end(tree: &mut ExpressionTree, id: NodeId) -> Option<usize> {
    let children: SmallVec<[NodeId; 4]> = tree.node(id).children.clone();
    let mut child_max: Option<usize> = None;
    for child in children {
        let end = propagate_end(tree, child);
        child_max = match (child_max, end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
    let node = tree.node_mut(id);
    if node.end.is_none() {
        node.end = child_max;
    }
    node.end
}

/// Replace any operator-less `Default` node with fewer than two children by
/// its sole child (or remove it entirely). The root itself may be replaced.
fn collapse(tree: &mut ExpressionTree, id: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
    let children: SmallVec<[NodeId; 4]> = tree.node(id).children.clone();
    let mut kept: SmallVec<[NodeId; 4]> = SmallVec::new();
    for child in children {
        if let Some(replacement) = collapse(tree, child, Some(id)) {
            kept.push(replacement);
        }
    }
    for &k in &kept {
        tree.node_mut(k).parent = Some(id);
    }
    tree.node_mut(id).children = kept;

    let node = tree.node(id);
    if node.node_type == NodeType::Default && node.operator == OperatorType::None {
        match node.children.len() {
            0 => return None,
            1 => {
                let only = node.children[0];
                tree.node_mut(only).parent = parent;
                return Some(only);
            }
            _ => {}
        }
    }
    Some(id)
}
