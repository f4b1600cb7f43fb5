//! Expression parsing module
//!
//! This module turns filter expression text like
//! `[Value]*[Factor] > 10 AND [Name] == 'foo'` into a normalized
//! [`ExpressionTree`] ready for compilation.

pub(crate) mod builder;
pub(crate) mod normalizer;


use crate::error::Result;
use crate::tree::ExpressionTree;

/// Parse filter expression text into a normalized expression tree.
///
/// Empty or blank input yields a tree without a root (the empty-expression
/// marker); malformed input fails with [`FilterError::Format`](crate::FilterError::Format).
pub fn parse(text: &str) -> Result<ExpressionTree> {
    builder::build_tree(text)
}
