//! Tree-to-predicate compilation module
//!
//! Turns a normalized [`ExpressionTree`] into a [`CompiledExpression`]
//! against a typed input: compile once, evaluate many times.

pub(crate) mod build;
pub mod property;
pub mod value;


pub use property::{PropertyDef, PropertySource};
pub use value::{Value, ValueKind};

use crate::error::Result;
use crate::tree::ExpressionTree;

/// An executable expression over inputs of type `T`.
///
/// A pure function of its input: safe to share across threads and invoke
/// repeatedly. Typical usage compiles a filter once and runs it against a
/// sequence of candidate objects.
pub struct CompiledExpression<T> {
    kind: ValueKind,
    eval: build::EvalFn<T>,
}

impl<T> Clone for CompiledExpression<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            eval: self.eval.clone(),
        }
    }
}

impl<T: PropertySource> CompiledExpression<T> {
    /// The kind of value evaluation produces
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Evaluate against one input
    pub fn evaluate(&self, input: &T) -> Result<Value> {
        (self.eval)(input)
    }

    /// Evaluate and require a boolean result
    pub fn matches(&self, input: &T) -> Result<bool> {
        self.evaluate(input)?.as_bool()
    }
}

/// Compile a parsed tree. `Ok(None)` marks the empty expression (a tree
/// without a root).
pub fn compile<T: PropertySource>(tree: &ExpressionTree) -> Result<Option<CompiledExpression<T>>> {
    let Some(root) = tree.root() else {
        return Ok(None);
    };
    let operand = build::compile_node::<T>(tree, root)?;
    Ok(Some(CompiledExpression {
        kind: operand.kind(),
        eval: operand.into_eval(),
    }))
}

/// Parse and compile in one step
pub fn compile_text<T: PropertySource>(text: &str) -> Result<Option<CompiledExpression<T>>> {
    let tree = crate::parser::parse(text)?;
    compile(&tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;

    struct Item {
        value: i64,
        factor: i64,
        name: &'static str,
        flag: bool,
        when: chrono::NaiveDateTime,
    }

    impl Default for Item {
        fn default() -> Self {
            Self {
                value: 5,
                factor: 4,
                name: "Patata",
                flag: true,
                when: value::parse_date("2021-06-15").unwrap(),
            }
        }
    }

    impl PropertySource for Item {
        fn properties() -> &'static [PropertyDef<Self>] {
            &[
                PropertyDef {
                    name: "Value",
                    kind: ValueKind::Int,
                    get: |item| Value::Int(item.value),
                },
                PropertyDef {
                    name: "Factor",
                    kind: ValueKind::Int,
                    get: |item| Value::Int(item.factor),
                },
                PropertyDef {
                    name: "Name",
                    kind: ValueKind::Str,
                    get: |item| Value::Str(item.name.to_string()),
                },
                PropertyDef {
                    name: "Flag",
                    kind: ValueKind::Bool,
                    get: |item| Value::Bool(item.flag),
                },
                PropertyDef {
                    name: "When",
                    kind: ValueKind::Date,
                    get: |item| Value::Date(item.when),
                },
            ]
        }
    }

    fn eval_const(text: &str) -> Value {
        compile_text::<()>(text)
            .unwrap()
            .unwrap()
            .evaluate(&())
            .unwrap()
    }

    fn const_matches(text: &str) -> bool {
        compile_text::<()>(text)
            .unwrap()
            .unwrap()
            .matches(&())
            .unwrap()
    }

    fn item_matches(text: &str, item: &Item) -> bool {
        compile_text::<Item>(text)
            .unwrap()
            .unwrap()
            .matches(item)
            .unwrap()
    }

    #[test]
    fn test_constant_arithmetic() {
        assert_eq!(eval_const("4+4"), Value::Int(8));
        assert_eq!(eval_const("4*2+3"), Value::Int(11));
        assert_eq!(eval_const("3 + 2 * 4"), Value::Int(11));
        assert_eq!(eval_const("4*(2+3)"), Value::Int(20));
        assert_eq!(eval_const("10/2"), Value::Int(5));
        assert_eq!(eval_const("2^10"), Value::Int(1024));
    }

    #[test]
    fn test_parenthesis_collapsing_is_transparent() {
        assert_eq!(eval_const("(4)"), Value::Int(4));
        assert_eq!(eval_const("((4))"), Value::Int(4));
        assert_eq!(eval_const("((4+4))"), Value::Int(8));
    }

    #[test]
    fn test_float_arithmetic() {
        assert_eq!(eval_const("2.5 + 1.5"), Value::Float(4.0));
        // the left operand is primary, so the integer converts to float
        assert_eq!(eval_const("2.5 * 2"), Value::Float(5.0));
    }

    #[test]
    fn test_negative_literals() {
        assert_eq!(eval_const("-5"), Value::Int(-5));
        assert_eq!(eval_const("3*-2"), Value::Int(-6));
        assert_eq!(eval_const("4 - -2"), Value::Int(6));
    }

    #[test]
    fn test_modulo_fails_loudly_at_compile_time() {
        assert!(matches!(
            compile_text::<()>("10 % 3"),
            Err(FilterError::NotSupported(_))
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            compile_text::<Item>("[Value] / 0")
                .unwrap()
                .unwrap()
                .evaluate(&Item::default())
                .unwrap_err(),
            FilterError::DivisionByZero
        );
    }

    #[test]
    fn test_relational_constants() {
        assert!(const_matches("3 > 2"));
        assert!(!const_matches("1 >= 2"));
        assert!(const_matches("2 <= 2"));
        assert!(const_matches("1 <> 2"));
        assert!(const_matches("'Texto' == 'Texto'"));
        // no implicit wildcarding for ==
        assert!(!const_matches("'Texto' == 'Tex*'"));
    }

    #[test]
    fn test_equals_on_strings_ignores_case() {
        assert!(const_matches("'TEXTO' == 'texto'"));
        // NotEqual stays native, so case differences count
        assert!(const_matches("'a' != 'A'"));
    }

    #[test]
    fn test_property_resolution() {
        let item = Item::default();
        let compiled = compile_text::<Item>("[Value]*[Factor]").unwrap().unwrap();
        assert_eq!(compiled.kind(), ValueKind::Int);
        assert_eq!(compiled.evaluate(&item).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_predicate_over_items() {
        let compiled = compile_text::<Item>("[Value]*[Factor] > 10").unwrap().unwrap();
        assert!(compiled.matches(&Item::default()).unwrap());
        assert!(!compiled
            .matches(&Item {
                value: 1,
                ..Item::default()
            })
            .unwrap());
    }

    #[test]
    fn test_string_escape_forms_are_equivalent() {
        let item = Item {
            name: "Patata'",
            ..Item::default()
        };
        assert!(item_matches("[Name]=='Patata'''", &item));
        assert!(item_matches("[Name]=='Patata\\''", &item));
    }

    #[test]
    fn test_like_through_the_compiler() {
        let item = Item::default();
        assert!(item_matches("[Name] = 'Pat*'", &item));
        assert!(item_matches("[Name] LIKE '?atata'", &item));
        assert!(item_matches("[Name] = 'patata'", &item));
        assert!(!item_matches("[Name] = 'Px*'", &item));
    }

    #[test]
    fn test_in_membership() {
        let item = Item::default();
        assert!(item_matches("[Value] IN (1, 5, 9)", &item));
        assert!(!item_matches("[Value] IN (1, 2)", &item));
        // the scalar converts to the list's element kind
        assert!(item_matches("[Value] IN ('5', '6')", &item));
    }

    #[test]
    fn test_in_without_a_list_is_not_supported() {
        assert!(matches!(
            compile_text::<Item>("[Value] IN 5"),
            Err(FilterError::NotSupported(_))
        ));
    }

    #[test]
    fn test_date_comparison() {
        let item = Item::default();
        assert!(item_matches("[When] > #2020-01-01#", &item));
        assert!(!item_matches("[When] > #2022-01-01#", &item));
        assert!(item_matches("[When] == #2021-06-15#", &item));
    }

    #[test]
    fn test_unparseable_date_fails() {
        assert!(matches!(
            compile_text::<Item>("[When] > #banana#"),
            Err(FilterError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn test_logical_operators() {
        let item = Item::default();
        assert!(item_matches("[Value] > 1 AND [Factor] > 1", &item));
        assert!(!item_matches("[Value] > 9 AND [Factor] > 1", &item));
        assert!(item_matches("[Value] > 9 OR [Factor] > 1", &item));
        assert!(item_matches("NOT [Flag] OR [Value] == 5", &item));
        assert!(item_matches("NOT ([Value] > 10)", &item));
    }

    #[test]
    fn test_boolean_literal_comparison() {
        let item = Item::default();
        assert!(item_matches("[Flag] == true", &item));
        assert!(!item_matches("[Flag] == false", &item));
    }

    #[test]
    fn test_unknown_property_fails() {
        assert!(matches!(
            compile_text::<Item>("[Missing] > 1"),
            Err(FilterError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_property_lookup_ignores_case() {
        assert!(item_matches("[value] == 5", &Item::default()));
    }

    #[test]
    fn test_conversion_failure_surfaces_at_compile_time() {
        assert!(matches!(
            compile_text::<Item>("[Value] > 'abc'"),
            Err(FilterError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn test_adjacent_values_are_an_invalid_tree() {
        assert!(matches!(
            compile_text::<()>("4 5"),
            Err(FilterError::InvalidTree(_))
        ));
    }

    #[test]
    fn test_empty_expression_compiles_to_none() {
        assert!(compile_text::<()>("").unwrap().is_none());
        assert!(compile_text::<()>("   ").unwrap().is_none());
    }

    #[test]
    fn test_compiled_expression_is_reusable() {
        let compiled = compile_text::<Item>("[Value] > 3").unwrap().unwrap();
        for value in 0..10 {
            let item = Item {
                value,
                ..Item::default()
            };
            assert_eq!(compiled.matches(&item).unwrap(), value > 3);
        }
    }
}
