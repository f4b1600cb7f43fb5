//! Character scanner and node builder
//!
//! Consumes the source string left-to-right exactly once (plus bounded
//! recursive descents into delimited spans) and produces a raw node tree.
//! Operator precedence is resolved while scanning: each incoming operator
//! climbs from the most recent operand to the highest ancestor that binds
//! at least as tight, then rewrites that node in place into an operator
//! wrapper. No separate token stream or shunting-yard stack exists.

use smallvec::smallvec;

use crate::error::{FilterError, Result};
use crate::tree::{ExpressionNode, ExpressionTree, NodeId, NodeType, OperatorType};

/// Build a raw expression tree from source text.
///
/// The returned tree is not yet normalized; `parse` runs the normalizer
/// before handing the tree out.
pub(crate) fn build_tree(source: &str) -> Result<ExpressionTree> {
    TreeBuilder::new(source).build()
}

/// Classification of the pending text buffer.
///
/// A class change between appended characters flushes the buffer, which is
/// how adjacent tokens split without whitespace (`10>5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Empty,
    /// A run of operator symbol characters (`=<>!&|+*/%^`)
    Symbol,
    /// Anything else: digits, letters, bare words
    Text,
}

struct TreeBuilder {
    tree: ExpressionTree,
    chars: Vec<(usize, char)>,
    buffer: String,
    buffer_start: usize,
    buffer_end: usize,
    buffer_kind: BufferKind,
}

impl TreeBuilder {
    fn new(source: &str) -> Self {
        Self {
            tree: ExpressionTree::new(source),
            chars: source.char_indices().collect(),
            buffer: String::new(),
            buffer_start: 0,
            buffer_end: 0,
            buffer_kind: BufferKind::Empty,
        }
    }

    fn build(mut self) -> Result<ExpressionTree> {
        let root = self.tree.push(ExpressionNode::new(NodeType::Default, 0));
        self.tree.root = Some(root);
        let mut pos = 0;
        self.scan(&mut pos, root, None)?;
        crate::parser::normalizer::normalize(&mut self.tree);
        Ok(self.tree)
    }

    /// Scan one nesting level. `level` is the node collecting this level's
    /// children; `closer` is the delimiter that ends the level, `None` at
    /// the top.
    fn scan(&mut self, pos: &mut usize, level: NodeId, closer: Option<char>) -> Result<()> {
        let mut current = level;
        // set between a comma and the next token so a bare minus signs the
        // next list element instead of subtracting from the previous one
        let mut element_start = false;
        while *pos < self.chars.len() {
            let (idx, c) = self.chars[*pos];
            match c {
                '(' => {
                    element_start = false;
                    current = self.process_buffer(current)?;
                    let node_type = if self.tree.node(current).operator == OperatorType::In {
                        NodeType::List
                    } else {
                        NodeType::Default
                    };
                    let group = self.tree.push(ExpressionNode::new(node_type, idx));
                    self.tree.attach(current, group);
                    *pos += 1;
                    self.scan(pos, group, Some(')'))?;
                }
                ')' => {
                    if closer != Some(')') {
                        return Err(FilterError::Format(format!(
                            "Unmatched ')' in '{}'",
                            self.tree.source
                        )));
                    }
                    self.process_buffer(current)?;
                    let node = self.tree.node_mut(level);
                    node.end = Some(idx);
                    node.locked = true;
                    *pos += 1;
                    return Ok(());
                }
                ']' => {
                    return Err(FilterError::Format(format!(
                        "Unmatched ']' in '{}'",
                        self.tree.source
                    )));
                }
                '\'' | '#' | '[' => {
                    element_start = false;
                    current = self.process_buffer(current)?;
                    self.scan_delimited(pos, current, c)?;
                }
                ' ' => {
                    current = self.process_buffer(current)?;
                    *pos += 1;
                }
                ',' => {
                    self.process_buffer(current)?;
                    // each list element builds against the group node
                    current = level;
                    element_start = true;
                    *pos += 1;
                }
                '-' => {
                    current = self.handle_minus(current, idx, element_start)?;
                    element_start = false;
                    *pos += 1;
                }
                _ => {
                    element_start = false;
                    let class = Self::char_class(c);
                    if self.buffer_kind != BufferKind::Empty && self.buffer_kind != class {
                        current = self.process_buffer(current)?;
                    }
                    self.push_buffer(idx, c, class);
                    *pos += 1;
                }
            }
        }
        if let Some(expected) = closer {
            return Err(FilterError::Format(format!(
                "Missing closing '{}' in '{}'",
                expected, self.tree.source
            )));
        }
        self.process_buffer(current)?;
        Ok(())
    }

    /// Scan a `'...'`, `#...#` or `[...]` span starting at `pos` (which
    /// points at the opener). Appends the resulting locked value node to
    /// `current` and advances `pos` past the closer.
    fn scan_delimited(&mut self, pos: &mut usize, current: NodeId, opener: char) -> Result<()> {
        let (open_idx, _) = self.chars[*pos];
        let (closer, node_type, escapes) = match opener {
            '\'' => ('\'', NodeType::Str, true),
            '#' => ('#', NodeType::Date, true),
            _ => (']', NodeType::Property, false),
        };
        let mut content = String::new();
        let mut decoded = false;
        let mut i = *pos + 1;
        loop {
            let Some(&(idx, c)) = self.chars.get(i) else {
                return Err(FilterError::Format(format!(
                    "Missing closing '{}' in '{}'",
                    closer, self.tree.source
                )));
            };
            if escapes && c == '\\' {
                let Some(&(_, next)) = self.chars.get(i + 1) else {
                    return Err(FilterError::Format(format!(
                        "Missing closing '{}' in '{}'",
                        closer, self.tree.source
                    )));
                };
                content.push(next);
                decoded = true;
                i += 2;
                continue;
            }
            if c == closer {
                // a doubled closer inside a quoted span is a literal; one
                // character of lookahead resolves the "possible end" state
                if escapes && self.chars.get(i + 1).map(|&(_, n)| n) == Some(closer) {
                    content.push(c);
                    decoded = true;
                    i += 2;
                    continue;
                }
                let end = idx + c.len_utf8() - 1;
                let child = self.tree.push(ExpressionNode::with_span(node_type, open_idx, end));
                {
                    let node = self.tree.node_mut(child);
                    node.locked = true;
                    if decoded {
                        node.formatted_text = Some(format!("{opener}{content}{closer}"));
                    }
                }
                self.tree.attach(current, child);
                *pos = i + 1;
                return Ok(());
            }
            content.push(c);
            i += 1;
        }
    }

    /// Decide whether `-` starts a signed value or applies subtraction.
    fn handle_minus(&mut self, current: NodeId, idx: usize, element_start: bool) -> Result<NodeId> {
        match self.buffer_kind {
            BufferKind::Symbol => {
                // previous token is an operator; the minus signs the value
                // that follows it
                let current = self.process_buffer(current)?;
                self.push_buffer(idx, '-', BufferKind::Text);
                Ok(current)
            }
            BufferKind::Text => {
                let current = self.process_buffer(current)?;
                self.apply_binary(current, OperatorType::Subtract, NodeType::Arithmetic)
            }
            BufferKind::Empty => {
                let node = self.tree.node(current);
                if element_start || node.expects_operand() || node.children.is_empty() {
                    self.push_buffer(idx, '-', BufferKind::Text);
                    Ok(current)
                } else {
                    self.apply_binary(current, OperatorType::Subtract, NodeType::Arithmetic)
                }
            }
        }
    }

    fn char_class(c: char) -> BufferKind {
        match c {
            '=' | '<' | '>' | '!' | '&' | '|' | '+' | '*' | '/' | '%' | '^' => BufferKind::Symbol,
            _ => BufferKind::Text,
        }
    }

    fn push_buffer(&mut self, idx: usize, c: char, class: BufferKind) {
        if self.buffer.is_empty() {
            self.buffer_start = idx;
            self.buffer_kind = class;
        }
        self.buffer_end = idx + c.len_utf8() - 1;
        self.buffer.push(c);
    }

    /// Flush the pending buffer: dispatch operator keywords/symbols, or
    /// create a value node. Returns the node that becomes current.
    fn process_buffer(&mut self, current: NodeId) -> Result<NodeId> {
        if self.buffer.is_empty() {
            return Ok(current);
        }
        let text = std::mem::take(&mut self.buffer);
        let start = self.buffer_start;
        let end = self.buffer_end;
        self.buffer_kind = BufferKind::Empty;

        let keyword = text.to_ascii_uppercase();
        let binary = match keyword.as_str() {
            "AND" | "&&" => Some((OperatorType::And, NodeType::Logical)),
            "OR" | "||" => Some((OperatorType::Or, NodeType::Logical)),
            "==" => Some((OperatorType::Equals, NodeType::Relational)),
            "<>" | "!=" => Some((OperatorType::NotEqual, NodeType::Relational)),
            "=" | "LIKE" => Some((OperatorType::Like, NodeType::Relational)),
            "IN" => Some((OperatorType::In, NodeType::Relational)),
            ">" => Some((OperatorType::GreaterThan, NodeType::Relational)),
            ">=" | "=>" => Some((OperatorType::GreaterThanOrEqual, NodeType::Relational)),
            "<" => Some((OperatorType::LessThan, NodeType::Relational)),
            "<=" | "=<" => Some((OperatorType::LessThanOrEqual, NodeType::Relational)),
            "+" => Some((OperatorType::Add, NodeType::Arithmetic)),
            "-" => Some((OperatorType::Subtract, NodeType::Arithmetic)),
            "*" => Some((OperatorType::Multiply, NodeType::Arithmetic)),
            "/" => Some((OperatorType::Divide, NodeType::Arithmetic)),
            "%" => Some((OperatorType::Modulo, NodeType::Arithmetic)),
            "^" => Some((OperatorType::Power, NodeType::Arithmetic)),
            "NOT" | "!" => {
                let not = self.tree.push(ExpressionNode::new(NodeType::Logical, start));
                self.tree.node_mut(not).operator = OperatorType::Not;
                self.tree.attach(current, not);
                return Ok(not);
            }
            _ => None,
        };

        match binary {
            Some((op, node_type)) => self.apply_binary(current, op, node_type),
            None => {
                let value = self.tree.push(ExpressionNode::with_span(NodeType::Unknown, start, end));
                self.tree.attach(current, value);
                Ok(current)
            }
        }
    }

    /// Insert a binary operator: climb from the most recent operand to the
    /// highest unlocked ancestor binding at least as tight as `op`, then
    /// rewrite that node in place into the operator wrapper. The rewritten
    /// node becomes current so the next operand lands inside it.
    fn apply_binary(
        &mut self,
        current: NodeId,
        op: OperatorType,
        node_type: NodeType,
    ) -> Result<NodeId> {
        let cur = self.tree.node(current);
        if cur.node_type == NodeType::Relational && cur.expects_operand() {
            return Err(FilterError::Format(format!(
                "Operator '{:?}' follows an incomplete comparison in '{}'",
                op, self.tree.source
            )));
        }
        let Some(&operand) = cur.children.last() else {
            return Err(FilterError::Format(format!(
                "Operator '{:?}' has no left operand in '{}'",
                op, self.tree.source
            )));
        };

        let mut target = operand;
        while let Some(parent) = self.tree.node(target).parent {
            let p = self.tree.node(parent);
            if p.locked || p.operator.priority() < op.priority() {
                break;
            }
            target = parent;
        }
        self.wrap(target, op, node_type);
        Ok(target)
    }

    /// Push `target`'s current contents down into a fresh child and turn
    /// `target` itself into an operator node with a cleared end index.
    fn wrap(&mut self, target: NodeId, op: OperatorType, node_type: NodeType) {
        let old = self.tree.node(target).clone();
        let child = self.tree.push(ExpressionNode {
            start: old.start,
            end: old.end,
            node_type: old.node_type,
            operator: old.operator,
            locked: old.locked,
            formatted_text: old.formatted_text,
            children: old.children.clone(),
            parent: Some(target),
        });
        for &grand in &old.children {
            self.tree.node_mut(grand).parent = Some(child);
        }
        let node = self.tree.node_mut(target);
        node.children = smallvec![child];
        node.operator = op;
        node.node_type = node_type;
        node.end = None;
        node.locked = false;
        node.formatted_text = None;
    }
}
