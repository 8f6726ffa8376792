//! The expression evaluator boundary.
//!
//! The core never interprets formula text itself. An [`Evaluator`] receives
//! the expression and an [`EvalContext`] carrying exactly three bindings: the
//! avatar (read-only), the target's current value and the trigger's current
//! value. Implementations must not expose anything beyond these.

use crate::avatar::Avatar;
use crate::error::BoxError;
use crate::value::Value;

/// Variables visible to a formula expression.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// The avatar being updated, for cross-indicator reads.
    pub avatar: &'a Avatar,
    /// Current value of the rule's target indicator.
    pub value: &'a Value,
    /// Current value of the rule's trigger indicator.
    pub trigger_value: &'a Value,
}

/// Evaluates formula expressions.
pub trait Evaluator {
    /// Evaluates `expression` against `ctx` and returns the resulting value.
    fn evaluate(&self, expression: &str, ctx: &EvalContext<'_>) -> Result<Value, BoxError>;

    /// Checks `expression` without evaluating it.
    ///
    /// Used by [`Avatar::check_formulas`]. The default accepts everything.
    fn check(&self, _expression: &str) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<F> Evaluator for F
where
    F: Fn(&str, &EvalContext<'_>) -> Result<Value, BoxError>,
{
    fn evaluate(&self, expression: &str, ctx: &EvalContext<'_>) -> Result<Value, BoxError> {
        self(expression, ctx)
    }
}
