//! Expression node structure and operator tables

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index of a node inside its tree's arena
pub type NodeId = usize;

/// Classification of a node in the expression tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Synthetic grouping node (tree root, parenthesized span)
    Default,
    /// Comma-separated value list inside an `IN (...)` context
    List,
    /// Single-quoted string literal
    Str,
    /// `#`-delimited date literal
    Date,
    /// `[Name]`-bracketed property reference
    Property,
    /// Unclassified value token (number, boolean, bare word)
    Unknown,
    /// Comparison operator node
    Relational,
    /// `AND` / `OR` / `NOT` node
    Logical,
    /// `+ - * / % ^` node
    Arithmetic,
}

/// Operator carried by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorType {
    None,
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    In,
    And,
    Or,
    Not,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl OperatorType {
    /// Binding priority, ascending. Lower binds looser; this total order
    /// governs every re-parenting decision during the build.
    pub fn priority(self) -> u8 {
        match self {
            OperatorType::None => 0,
            OperatorType::Like | OperatorType::In | OperatorType::Or => 1,
            OperatorType::And => 2,
            OperatorType::Not => 3,
            OperatorType::Equals
            | OperatorType::NotEqual
            | OperatorType::GreaterThan
            | OperatorType::GreaterThanOrEqual
            | OperatorType::LessThan
            | OperatorType::LessThanOrEqual => 4,
            OperatorType::Add | OperatorType::Subtract => 5,
            OperatorType::Multiply | OperatorType::Divide | OperatorType::Modulo => 6,
            OperatorType::Power => 7,
        }
    }
}

/// A single node of an expression tree.
///
/// Nodes live in the arena of their owning [`ExpressionTree`](crate::tree::ExpressionTree)
/// and address each other by index. The `parent` link is a plain index,
/// never a second owner.
#[derive(Debug, Clone)]
pub struct ExpressionNode {
    /// Byte index of the first character of this node's span
    pub start: usize,
    /// Byte index of the last character of this node's span (inclusive).
    /// `None` while an operator wrapper is still waiting for its second
    /// operand; the normalizer fills it in from the children.
    pub end: Option<usize>,
    pub node_type: NodeType,
    pub operator: OperatorType,
    /// True once the span was bounded by an explicit delimiter. Locked
    /// nodes are never re-parented by later operator processing.
    pub locked: bool,
    /// Decoded text when escape sequences made the raw span inaccurate.
    /// Authoritative over the span when present.
    pub formatted_text: Option<String>,
    pub children: SmallVec<[NodeId; 4]>,
    pub parent: Option<NodeId>,
}

impl ExpressionNode {
    /// Create a bare node of the given type spanning a single start index
    pub fn new(node_type: NodeType, start: usize) -> Self {
        Self {
            start,
            end: None,
            node_type,
            operator: OperatorType::None,
            locked: false,
            formatted_text: None,
            children: SmallVec::new(),
            parent: None,
        }
    }

    /// Create a value node with a fully determined span
    pub fn with_span(node_type: NodeType, start: usize, end: usize) -> Self {
        let mut node = Self::new(node_type, start);
        node.end = Some(end);
        node
    }

    /// Whether this node still accepts an operand for its operator
    pub fn expects_operand(&self) -> bool {
        match self.operator {
            OperatorType::None => false,
            OperatorType::Not => self.children.is_empty(),
            _ => self.children.len() < 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(OperatorType::Or.priority() < OperatorType::And.priority());
        assert!(OperatorType::And.priority() < OperatorType::Not.priority());
        assert!(OperatorType::Not.priority() < OperatorType::Equals.priority());
        assert!(OperatorType::Equals.priority() < OperatorType::Add.priority());
        assert!(OperatorType::Add.priority() < OperatorType::Multiply.priority());
        assert!(OperatorType::Multiply.priority() < OperatorType::Power.priority());
        assert_eq!(OperatorType::Like.priority(), OperatorType::In.priority());
        assert_eq!(OperatorType::None.priority(), 0);
    }

    #[test]
    fn test_expects_operand() {
        let mut node = ExpressionNode::new(NodeType::Relational, 0);
        node.operator = OperatorType::GreaterThan;
        assert!(node.expects_operand());
        node.children.push(1);
        assert!(node.expects_operand());
        node.children.push(2);
        assert!(!node.expects_operand());

        let mut not = ExpressionNode::new(NodeType::Logical, 0);
        not.operator = OperatorType::Not;
        assert!(not.expects_operand());
        not.children.push(1);
        assert!(!not.expects_operand());
    }
}
