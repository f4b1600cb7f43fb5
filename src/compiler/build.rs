//! Node-to-predicate compilation
//!
//! Walks a normalized expression tree and produces an evaluation closure
//! per node. Literal conversion, accessor resolution and operand-kind
//! analysis all happen once at compile time; constant subexpressions fold
//! immediately, so evaluation touches only the input object.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::compiler::property::{find_property, PropertySource};
use crate::compiler::value::{convert, ordering, parse_date, Value, ValueKind};
use crate::error::{FilterError, Result};
use crate::like::{like_match, LikeOptions};
use crate::tree::{ExpressionTree, NodeId, NodeType, OperatorType};

pub(crate) type EvalFn<T> = Arc<dyn Fn(&T) -> Result<Value> + Send + Sync>;

/// A compiled operand: either folded to a constant or a closure over the
/// input, tagged with the kind it will produce.
pub(crate) enum Operand<T> {
    Const(Value),
    Dynamic { kind: ValueKind, eval: EvalFn<T> },
}

impl<T: 'static> Operand<T> {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Operand::Const(value) => value.kind(),
            Operand::Dynamic { kind, .. } => *kind,
        }
    }

    fn is_const(&self) -> bool {
        matches!(self, Operand::Const(_))
    }

    pub(crate) fn into_eval(self) -> EvalFn<T> {
        match self {
            Operand::Const(value) => Arc::new(move |_| Ok(value.clone())),
            Operand::Dynamic { eval, .. } => eval,
        }
    }
}

pub(crate) fn compile_node<T: PropertySource>(
    tree: &ExpressionTree,
    id: NodeId,
) -> Result<Operand<T>> {
    let node = tree.node(id);
    match node.node_type {
        NodeType::Relational => compile_relational(tree, id),
        NodeType::Arithmetic => compile_arithmetic(tree, id),
        NodeType::Logical => compile_logical(tree, id),
        NodeType::List => compile_list(tree, id),
        NodeType::Str => Ok(Operand::Const(Value::Str(
            strip_markers(tree.text(id)).to_string(),
        ))),
        NodeType::Date => compile_date(tree.text(id)),
        NodeType::Property => compile_property(tree.text(id)),
        NodeType::Unknown => compile_unknown(tree.text(id)),
        NodeType::Default => Err(FilterError::InvalidTree(format!(
            "Grouping node with {} children has no operator",
            node.children.len()
        ))),
    }
}

/// Drop the single-character delimiters surrounding a literal span
fn strip_markers(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        ""
    }
}

fn compile_date<T>(text: &str) -> Result<Operand<T>> {
    let body = strip_markers(text);
    match parse_date(body) {
        Some(datetime) => Ok(Operand::Const(Value::Date(datetime))),
        None => Err(FilterError::ConversionFailed {
            value: body.to_string(),
            target: ValueKind::Date.to_string(),
        }),
    }
}

fn compile_property<T: PropertySource>(text: &str) -> Result<Operand<T>> {
    let name = strip_markers(text).trim();
    property_operand(name).ok_or_else(|| FilterError::UnknownProperty(name.to_string()))
}

fn property_operand<T: PropertySource>(name: &str) -> Option<Operand<T>> {
    let def = find_property::<T>(name)?;
    Some(Operand::Dynamic {
        kind: def.kind,
        eval: Arc::new(move |input| Ok((def.get)(input))),
    })
}

/// Guess order for unclassified tokens: integer, float, boolean, property
/// name, raw-string fallback.
fn compile_unknown<T: PropertySource>(text: &str) -> Result<Operand<T>> {
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Operand::Const(Value::Int(int)));
    }
    if let Ok(float) = text.parse::<f64>() {
        return Ok(Operand::Const(Value::Float(float)));
    }
    if text.eq_ignore_ascii_case("true") {
        return Ok(Operand::Const(Value::Bool(true)));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(Operand::Const(Value::Bool(false)));
    }
    if let Some(operand) = property_operand(text) {
        return Ok(operand);
    }
    Ok(Operand::Const(Value::Str(text.to_string())))
}

/// Split a binary node into compiled (left, right) operands
fn binary_operands<T: PropertySource>(
    tree: &ExpressionTree,
    id: NodeId,
) -> Result<(Operand<T>, Operand<T>)> {
    let node = tree.node(id);
    if node.children.len() != 2 {
        return Err(FilterError::InvalidTree(format!(
            "Operator '{:?}' expects exactly 2 operands, found {}",
            node.operator,
            node.children.len()
        )));
    }
    let left = compile_node(tree, node.children[0])?;
    let right = compile_node(tree, node.children[1])?;
    Ok((left, right))
}

fn compile_relational<T: PropertySource>(tree: &ExpressionTree, id: NodeId) -> Result<Operand<T>> {
    let op = tree.node(id).operator;
    let (left, right) = binary_operands(tree, id)?;
    if op == OperatorType::In {
        return compile_in(left, right);
    }

    // the first non-constant operand dictates the common kind; two
    // constants tie-break to the left
    let left_primary = !left.is_const() || right.is_const();
    let target = if left_primary { left.kind() } else { right.kind() };

    match (left, right) {
        (Operand::Const(l), Operand::Const(r)) => {
            let r = convert(&r, target)?;
            Ok(Operand::Const(Value::Bool(apply_relational(op, &l, &r)?)))
        }
        (left, right) => {
            let (left, right) = if left_primary {
                (left, convert_operand(right, target)?)
            } else {
                (convert_operand(left, target)?, right)
            };
            let le = left.into_eval();
            let re = right.into_eval();
            Ok(Operand::Dynamic {
                kind: ValueKind::Bool,
                eval: Arc::new(move |input| {
                    Ok(Value::Bool(apply_relational(op, &le(input)?, &re(input)?)?))
                }),
            })
        }
    }
}

/// Convert the secondary operand to the primary kind: constants convert
/// now (a bad literal fails the compile), dynamic operands convert each
/// evaluation.
fn convert_operand<T: 'static>(operand: Operand<T>, target: ValueKind) -> Result<Operand<T>> {
    match operand {
        Operand::Const(value) => Ok(Operand::Const(convert(&value, target)?)),
        Operand::Dynamic { kind, eval } if kind == target => Ok(Operand::Dynamic { kind, eval }),
        Operand::Dynamic { eval, .. } => Ok(Operand::Dynamic {
            kind: target,
            eval: Arc::new(move |input| convert(&eval(input)?, target)),
        }),
    }
}

fn apply_relational(op: OperatorType, left: &Value, right: &Value) -> Result<bool> {
    match op {
        OperatorType::Equals => Ok(match (left, right) {
            (Value::Str(a), Value::Str(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => left == right,
        }),
        OperatorType::NotEqual => Ok(left != right),
        OperatorType::GreaterThan => Ok(ordering(left, right)? == Ordering::Greater),
        OperatorType::GreaterThanOrEqual => Ok(ordering(left, right)? != Ordering::Less),
        OperatorType::LessThan => Ok(ordering(left, right)? == Ordering::Less),
        OperatorType::LessThanOrEqual => Ok(ordering(left, right)? != Ordering::Greater),
        OperatorType::Like => {
            let Value::Str(subject) = convert(left, ValueKind::Str)? else {
                unreachable!()
            };
            let Value::Str(pattern) = convert(right, ValueKind::Str)? else {
                unreachable!()
            };
            Ok(like_match(&subject, &pattern, &LikeOptions::default()))
        }
        other => Err(FilterError::InvalidTree(format!(
            "'{:?}' is not a comparison operator",
            other
        ))),
    }
}

/// `IN` membership: one operand must be a list; the scalar converts to the
/// list's element kind when the list is homogeneous.
fn compile_in<T: PropertySource>(left: Operand<T>, right: Operand<T>) -> Result<Operand<T>> {
    let (scalar, list) = if right.kind() == ValueKind::List {
        (left, right)
    } else if left.kind() == ValueKind::List {
        (right, left)
    } else {
        return Err(FilterError::NotSupported(
            "IN requires one operand to be a list".to_string(),
        ));
    };

    if let (Operand::Const(scalar), Operand::Const(Value::List(items))) = (&scalar, &list) {
        return Ok(Operand::Const(Value::Bool(list_contains(items, scalar)?)));
    }

    let se = scalar.into_eval();
    let le = list.into_eval();
    Ok(Operand::Dynamic {
        kind: ValueKind::Bool,
        eval: Arc::new(move |input| {
            let Value::List(items) = le(input)? else {
                return Err(FilterError::NotSupported(
                    "IN requires one operand to be a list".to_string(),
                ));
            };
            Ok(Value::Bool(list_contains(&items, &se(input)?)?))
        }),
    })
}

fn list_contains(items: &[Value], scalar: &Value) -> Result<bool> {
    let shared_kind = items
        .split_first()
        .and_then(|(first, rest)| {
            let kind = first.kind();
            rest.iter().all(|item| item.kind() == kind).then_some(kind)
        });
    let needle = match shared_kind {
        Some(kind) => convert(scalar, kind)?,
        None => scalar.clone(),
    };
    Ok(items.contains(&needle))
}

fn compile_arithmetic<T: PropertySource>(tree: &ExpressionTree, id: NodeId) -> Result<Operand<T>> {
    let op = tree.node(id).operator;
    if op == OperatorType::Modulo {
        return Err(FilterError::NotSupported(
            "Modulo arithmetic is not implemented".to_string(),
        ));
    }
    let (left, right) = binary_operands(tree, id)?;

    let left_primary = !left.is_const() || right.is_const();
    let target = if left_primary { left.kind() } else { right.kind() };

    match (left, right) {
        (Operand::Const(l), Operand::Const(r)) => {
            let r = convert(&r, target)?;
            Ok(Operand::Const(apply_arithmetic(op, &l, &r)?))
        }
        (left, right) => {
            let (left, right) = if left_primary {
                (left, convert_operand(right, target)?)
            } else {
                (convert_operand(left, target)?, right)
            };
            let le = left.into_eval();
            let re = right.into_eval();
            Ok(Operand::Dynamic {
                kind: target,
                eval: Arc::new(move |input| apply_arithmetic(op, &le(input)?, &re(input)?)),
            })
        }
    }
}

fn apply_arithmetic(op: OperatorType, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            OperatorType::Add => Ok(Value::Int(a.wrapping_add(*b))),
            OperatorType::Subtract => Ok(Value::Int(a.wrapping_sub(*b))),
            OperatorType::Multiply => Ok(Value::Int(a.wrapping_mul(*b))),
            OperatorType::Divide => {
                if *b == 0 {
                    Err(FilterError::DivisionByZero)
                } else {
                    Ok(Value::Int(a.wrapping_div(*b)))
                }
            }
            OperatorType::Power => {
                if *b >= 0 {
                    Ok(Value::Int(a.wrapping_pow(*b as u32)))
                } else {
                    Ok(Value::Float((*a as f64).powi(*b as i32)))
                }
            }
            other => invalid_arithmetic(other, left, right),
        },
        (Value::Float(a), Value::Float(b)) => match op {
            OperatorType::Add => Ok(Value::Float(a + b)),
            OperatorType::Subtract => Ok(Value::Float(a - b)),
            OperatorType::Multiply => Ok(Value::Float(a * b)),
            OperatorType::Divide => Ok(Value::Float(a / b)),
            OperatorType::Power => Ok(Value::Float(a.powf(*b))),
            other => invalid_arithmetic(other, left, right),
        },
        (Value::Str(a), Value::Str(b)) if op == OperatorType::Add => {
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        _ => invalid_arithmetic(op, left, right),
    }
}

fn invalid_arithmetic(op: OperatorType, left: &Value, right: &Value) -> Result<Value> {
    Err(FilterError::NotSupported(format!(
        "Cannot apply '{:?}' to {} and {}",
        op,
        left.kind(),
        right.kind()
    )))
}

fn compile_logical<T: PropertySource>(tree: &ExpressionTree, id: NodeId) -> Result<Operand<T>> {
    let node = tree.node(id);
    match node.operator {
        OperatorType::Not => {
            if node.children.len() != 1 {
                return Err(FilterError::InvalidTree(format!(
                    "NOT expects exactly 1 operand, found {}",
                    node.children.len()
                )));
            }
            match compile_node(tree, node.children[0])? {
                Operand::Const(value) => Ok(Operand::Const(Value::Bool(!value.as_bool()?))),
                operand => {
                    let eval = operand.into_eval();
                    Ok(Operand::Dynamic {
                        kind: ValueKind::Bool,
                        eval: Arc::new(move |input| Ok(Value::Bool(!eval(input)?.as_bool()?))),
                    })
                }
            }
        }
        op @ (OperatorType::And | OperatorType::Or) => {
            if node.children.is_empty() {
                return Err(FilterError::InvalidTree(format!(
                    "'{:?}' requires at least one operand",
                    op
                )));
            }
            let operands = node
                .children
                .iter()
                .map(|&child| compile_node(tree, child))
                .collect::<Result<Vec<_>>>()?;
            let is_and = op == OperatorType::And;

            if operands.iter().all(|operand| operand.is_const()) {
                let mut result = is_and;
                for operand in &operands {
                    let Operand::Const(value) = operand else { unreachable!() };
                    let truth = value.as_bool()?;
                    if is_and && !truth {
                        result = false;
                        break;
                    }
                    if !is_and && truth {
                        result = true;
                        break;
                    }
                    result = truth;
                }
                return Ok(Operand::Const(Value::Bool(result)));
            }

            let evals: Vec<EvalFn<T>> = operands.into_iter().map(Operand::into_eval).collect();
            Ok(Operand::Dynamic {
                kind: ValueKind::Bool,
                eval: Arc::new(move |input| {
                    // left-to-right fold with short-circuit
                    for eval in &evals {
                        let truth = eval(input)?.as_bool()?;
                        if is_and && !truth {
                            return Ok(Value::Bool(false));
                        }
                        if !is_and && truth {
                            return Ok(Value::Bool(true));
                        }
                    }
                    Ok(Value::Bool(is_and))
                }),
            })
        }
        other => Err(FilterError::InvalidTree(format!(
            "'{:?}' is not a logical operator",
            other
        ))),
    }
}

fn compile_list<T: PropertySource>(tree: &ExpressionTree, id: NodeId) -> Result<Operand<T>> {
    let node = tree.node(id);
    let operands = node
        .children
        .iter()
        .map(|&child| compile_node(tree, child))
        .collect::<Result<Vec<_>>>()?;

    if operands.iter().all(|operand| operand.is_const()) {
        let items = operands
            .into_iter()
            .map(|operand| match operand {
                Operand::Const(value) => value,
                Operand::Dynamic { .. } => unreachable!(),
            })
            .collect();
        return Ok(Operand::Const(Value::List(items)));
    }

    let evals: Vec<EvalFn<T>> = operands.into_iter().map(Operand::into_eval).collect();
    Ok(Operand::Dynamic {
        kind: ValueKind::List,
        eval: Arc::new(move |input| {
            let items = evals
                .iter()
                .map(|eval| eval(input))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(items))
        }),
    })
}
