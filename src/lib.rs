//! Filter Expr Core - High-performance filter expression engine
//!
//! This crate parses human-readable filter expressions like
//! `[Value]*[Factor] > 10 AND [Name] == 'foo'` into an expression tree and
//! compiles the tree into an executable predicate over a typed input
//! object. Parsing is a single hand-written character scan with in-place
//! operator-precedence resolution; compilation folds constants, resolves
//! `[Name]` references through a cached accessor lookup and yields a pure
//! function that can be invoked concurrently and repeatedly.
//!
//! ```
//! use filter_expr_core::{compile_text, PropertyDef, PropertySource, Value, ValueKind};
//!
//! struct Item {
//!     value: i64,
//!     factor: i64,
//! }
//!
//! impl PropertySource for Item {
//!     fn properties() -> &'static [PropertyDef<Self>] {
//!         &[
//!             PropertyDef {
//!                 name: "Value",
//!                 kind: ValueKind::Int,
//!                 get: |item| Value::Int(item.value),
//!             },
//!             PropertyDef {
//!                 name: "Factor",
//!                 kind: ValueKind::Int,
//!                 get: |item| Value::Int(item.factor),
//!             },
//!         ]
//!     }
//! }
//!
//! let filter = compile_text::<Item>("[Value]*[Factor] > 10").unwrap().unwrap();
//! assert!(filter.matches(&Item { value: 5, factor: 4 }).unwrap());
//! assert!(!filter.matches(&Item { value: 1, factor: 4 }).unwrap());
//! ```

pub mod compiler;
pub mod error;
pub mod like;
pub mod parser;
pub mod tree;

pub use crate::compiler::{
    compile, compile_text, CompiledExpression, PropertyDef, PropertySource, Value, ValueKind,
};
pub use crate::error::{FilterError, Result};
pub use crate::like::{like_match, LikeOptions};
pub use crate::parser::parse;
pub use crate::tree::{ExpressionNode, ExpressionTree, NodeId, NodeType, OperatorType};
