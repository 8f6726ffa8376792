//! Formula expression language for avatar propagation rules.
//!
//! Expressions are small, side-effect free, and see only three bindings:
//! `value` (the target's current value), `trigger_value` (the trigger's
//! current value) and `avatar` (read-only access to every indicator via
//! `avatar.<organ>.<indicator>`). They support arithmetic, comparisons,
//! boolean logic, conditionals, list displays with `*` spreads, indexing and
//! a fixed set of built-in functions.
//!
//! [`FormulaEvaluator`] plugs the language into [`avatar_core::avatar::Avatar`].

pub mod engine;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod types;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use avatar_core::error::BoxError;
use avatar_core::eval::{EvalContext, Evaluator};
use avatar_core::value::Value;
use tracing::trace;

pub use types::{Expr, FormulaError, Result};

/// Parses and evaluates `source` in one step.
pub fn evaluate(source: &str, ctx: &EvalContext<'_>) -> Result<Value> {
    let expr = parser::parse(source)?;
    engine::evaluate(&expr, ctx)
}

/// Parses `source` and rejects names and functions that can never resolve.
pub fn check(source: &str) -> Result<()> {
    let expr = parser::parse(source)?;
    check_expr(&expr)
}

fn check_expr(expr: &Expr) -> Result<()> {
    use types::ListItem;

    match expr {
        Expr::Literal(_) => Ok(()),
        Expr::Name(name) => match name.as_str() {
            "value" | "trigger_value" | "avatar" | "person" => Ok(()),
            other => Err(FormulaError::UnknownName(other.to_owned())),
        },
        Expr::List(items) => items.iter().try_for_each(|item| match item {
            ListItem::Single(e) | ListItem::Spread(e) => check_expr(e),
        }),
        Expr::Unary { operand, .. } => check_expr(operand),
        Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
            check_expr(lhs)?;
            check_expr(rhs)
        }
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            check_expr(condition)?;
            check_expr(then)?;
            check_expr(otherwise)
        }
        Expr::Call { function, args } => {
            if !functions::is_builtin(function) {
                return Err(FormulaError::UnknownFunction(function.clone()));
            }
            args.iter().try_for_each(check_expr)
        }
        Expr::Index { target, index } => {
            check_expr(target)?;
            check_expr(index)
        }
        Expr::Attribute { target, name } => match target.as_ref() {
            Expr::Name(root) if is_avatar(root) => Ok(()),
            Expr::Attribute { target: organ, .. }
                if matches!(organ.as_ref(), Expr::Name(root) if is_avatar(root)) =>
            {
                Ok(())
            }
            other => {
                check_expr(other)?;
                let subject = match other {
                    Expr::Name(root) => root.as_str(),
                    Expr::Attribute { .. } => "an indicator value",
                    _ => "an expression",
                };
                Err(FormulaError::type_error(format!(
                    "{subject} has no attribute {name}"
                )))
            }
        },
    }
}

fn is_avatar(name: &str) -> bool {
    matches!(name, "avatar" | "person")
}

/// [`Evaluator`] backed by the formula language.
///
/// Parsed expressions are cached by source text, so each rule is parsed
/// once per evaluator no matter how many passes fire it.
#[derive(Debug, Default)]
pub struct FormulaEvaluator {
    cache: RefCell<HashMap<String, Rc<Expr>>>,
}

impl FormulaEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn parsed(&self, source: &str) -> Result<Rc<Expr>> {
        if let Some(expr) = self.cache.borrow().get(source) {
            return Ok(Rc::clone(expr));
        }
        trace!(expression = source, "parsing formula");
        let expr = Rc::new(parser::parse(source)?);
        self.cache
            .borrow_mut()
            .insert(source.to_owned(), Rc::clone(&expr));
        Ok(expr)
    }

    /// Number of distinct expressions parsed so far.
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl Evaluator for FormulaEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        ctx: &EvalContext<'_>,
    ) -> std::result::Result<Value, BoxError> {
        let expr = self.parsed(expression)?;
        Ok(engine::evaluate(&expr, ctx)?)
    }

    fn check(&self, expression: &str) -> std::result::Result<(), BoxError> {
        Ok(check(expression)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_core::avatar::Avatar;

    #[test]
    fn check_accepts_valid_expressions() {
        for source in [
            "value + trigger_value",
            "[*value, 1]",
            "clamp(avatar.heart.rate, 0, 200)",
            "max(value, trigger_value) if trigger_value else 0",
        ] {
            assert_eq!(check(source), Ok(()), "{source}");
        }
    }

    #[test]
    fn check_rejects_unresolvable_names() {
        assert_eq!(check("os + 1"), Err(FormulaError::UnknownName("os".into())));
        assert_eq!(
            check("open('x')"),
            Err(FormulaError::UnknownFunction("open".into()))
        );
        assert!(check("value +").unwrap_err().is_syntax());
    }

    #[test]
    fn check_rejects_attributes_outside_avatar_paths() {
        assert_eq!(
            check("value.foo"),
            Err(FormulaError::Type("value has no attribute foo".into()))
        );
        assert_eq!(
            check("trigger_value.x + 1"),
            Err(FormulaError::Type("trigger_value has no attribute x".into()))
        );
        assert_eq!(
            check("avatar.heart.rate.real"),
            Err(FormulaError::Type(
                "an indicator value has no attribute real".into()
            ))
        );
        assert_eq!(
            check("[1].size"),
            Err(FormulaError::Type("an expression has no attribute size".into()))
        );
        assert_eq!(check("person.heart.rate"), Ok(()));
        assert_eq!(check("len(avatar.heart.ecg)"), Ok(()));
    }

    #[test]
    fn oversized_expressions_fail_instead_of_overflowing() {
        let avatar = Avatar::new(FormulaEvaluator::new());
        let value = Value::Int(1);
        let ctx = EvalContext {
            avatar: &avatar,
            value: &value,
            trigger_value: &value,
        };
        let evaluator = FormulaEvaluator::new();

        let long_chain = vec!["1"; 200_000].join(" + ");
        let err = Evaluator::evaluate(&evaluator, &long_chain, &ctx).unwrap_err();
        assert!(err.to_string().contains("expression too long"), "{err}");

        let deep_chain = vec!["value"; 100].join(" * ");
        assert!(check(&deep_chain).unwrap_err().is_syntax());
        assert_eq!(evaluator.cached(), 0);
    }

    #[test]
    fn evaluator_caches_parsed_expressions() {
        let avatar = Avatar::new(FormulaEvaluator::new());
        let evaluator = FormulaEvaluator::new();
        let value = Value::Int(2);
        let ctx = EvalContext {
            avatar: &avatar,
            value: &value,
            trigger_value: &value,
        };

        for _ in 0..3 {
            let result = Evaluator::evaluate(&evaluator, "value * trigger_value", &ctx).unwrap();
            assert_eq!(result, Value::Int(4));
        }
        assert_eq!(evaluator.cached(), 1);
    }

    #[test]
    fn evaluator_errors_keep_their_message() {
        let avatar = Avatar::new(FormulaEvaluator::new());
        let value = Value::Int(1);
        let ctx = EvalContext {
            avatar: &avatar,
            value: &value,
            trigger_value: &value,
        };
        let err = Evaluator::evaluate(&FormulaEvaluator::new(), "value / 0", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "division by zero");
    }
}
