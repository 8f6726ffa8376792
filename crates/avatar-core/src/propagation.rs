//! Fixed-point formula propagation.
//!
//! Starting from one changed indicator, each pass walks the formula sequence
//! in stored order and evaluates every rule whose trigger changed in the
//! previous pass. A rule whose result differs from its target's current value
//! writes the target immediately (later rules in the same pass see the write)
//! and puts the target into the next pass's frontier. Propagation stops when
//! a pass changes nothing.
//!
//! Termination rests on value equality alone. A rule set that keeps toggling
//! a value never settles; only an explicit pass limit
//! ([`Avatar::set_pass_limit`]) turns that into an error.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::avatar::Avatar;
use crate::error::{AvatarError, Result};
use crate::eval::EvalContext;
use crate::rule::IndicatorRef;
use crate::value::Value;

/// One value written by a formula during propagation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// Pass number, starting at 1.
    pub pass: usize,
    /// Index of the rule that produced the value.
    pub rule: usize,
    pub target: IndicatorRef,
    pub old: Value,
    pub new: Value,
}

/// What a propagation run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationReport {
    /// Number of passes run, including the final one that changed nothing.
    pub passes: usize,
    /// Applied writes, in application order.
    pub changes: Vec<Change>,
}

impl PropagationReport {
    /// Returns `true` if no formula changed any value.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Distinct indicators written, in first-write order.
    pub fn changed(&self) -> Vec<&IndicatorRef> {
        let mut seen = HashSet::new();
        self.changes
            .iter()
            .map(|c| &c.target)
            .filter(|t| seen.insert(*t))
            .collect()
    }
}

impl Avatar {
    /// Runs formulas transitively, starting from a changed indicator.
    ///
    /// # Errors
    ///
    /// - [`AvatarError::BrokenFormulaReference`] if a fired rule names a
    ///   missing indicator.
    /// - [`AvatarError::Expression`] if the evaluator fails.
    /// - [`AvatarError::TypeMismatch`] if a rule produces a value of the
    ///   wrong type for its target.
    /// - [`AvatarError::PassLimitExceeded`] if a pass limit is set and reached.
    ///
    /// Writes applied before an error are not rolled back.
    pub fn propagate(&mut self, origin: IndicatorRef) -> Result<PropagationReport> {
        let mut report = PropagationReport::default();
        let mut frontier: HashSet<IndicatorRef> = HashSet::from([origin]);

        while !frontier.is_empty() {
            if let Some(limit) = self.pass_limit {
                if report.passes >= limit {
                    return Err(AvatarError::PassLimitExceeded { limit });
                }
            }
            report.passes += 1;
            let pass = report.passes;
            debug!(pass, frontier = frontier.len(), "propagation pass");

            let mut next = HashSet::new();
            for index in 0..self.formulas.len() {
                if !frontier.contains(&self.formulas[index].trigger) {
                    continue;
                }
                if let Some(change) = self.fire(index, pass)? {
                    next.insert(change.target.clone());
                    report.changes.push(change);
                }
            }
            frontier = next;
        }

        debug!(
            passes = report.passes,
            changes = report.changes.len(),
            "propagation settled"
        );
        Ok(report)
    }

    /// Evaluates rule `index` and writes its target if the value changed.
    fn fire(&mut self, index: usize, pass: usize) -> Result<Option<Change>> {
        let rule = &self.formulas[index];
        let target = self
            .resolve(&rule.target)
            .ok_or_else(|| AvatarError::BrokenFormulaReference {
                rule: index,
                reference: rule.target.clone(),
            })?;
        let trigger = self
            .resolve(&rule.trigger)
            .ok_or_else(|| AvatarError::BrokenFormulaReference {
                rule: index,
                reference: rule.trigger.clone(),
            })?;

        let ctx = EvalContext {
            avatar: &*self,
            value: target.value(),
            trigger_value: trigger.value(),
        };
        let new = self
            .evaluator
            .evaluate(&rule.expression, &ctx)
            .map_err(|source| AvatarError::Expression {
                expression: rule.expression.clone(),
                source,
            })?;

        if &new == target.value() {
            trace!(rule = index, target = %rule.target, "formula result unchanged");
            return Ok(None);
        }

        let target_ref = rule.target.clone();
        let old = self.indicator_mut(&target_ref)?.set(new.clone())?;
        debug!(rule = index, target = %target_ref, %old, %new, "formula applied");
        Ok(Some(Change {
            pass,
            rule: index,
            target: target_ref,
            old,
            new,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::eval::Evaluator;
    use crate::indicator::Indicator;
    use crate::organ::Organ;
    use crate::rule::FormulaRule;
    use crate::value::TypeTag;
    use pretty_assertions::assert_eq;

    /// Coerces a closure into an evaluator with the right higher-ranked signature.
    fn evaluator<F>(f: F) -> F
    where
        F: Fn(&str, &EvalContext<'_>) -> std::result::Result<Value, BoxError>,
    {
        f
    }

    fn float(v: &Value) -> f64 {
        v.as_float().unwrap()
    }

    /// Tiny scripted evaluator covering the expressions used below.
    fn scripted() -> impl Evaluator {
        evaluator(|expr, ctx| {
            let value = ctx.value;
            let trigger = ctx.trigger_value;
            Ok(match expr {
                "value + trigger_value" => Value::Float(float(value) + float(trigger)),
                "trigger_value * 10" => Value::Float(float(trigger) * 10.0),
                "trigger_value" => trigger.clone(),
                "min(value + 1, 3)" => Value::Float((float(value) + 1.0).min(3.0)),
                "not value" => Value::Bool(!value.as_bool().unwrap()),
                "str(trigger_value)" => Value::Str(trigger.to_string()),
                "avatar.heart.rate * 2" => {
                    Value::Float(float(ctx.avatar.value("heart", "rate").unwrap()) * 2.0)
                }
                other => return Err(format!("cannot evaluate {other}").into()),
            })
        })
    }

    fn organ(name: &str, indicators: &[(&str, TypeTag, Value)]) -> Organ {
        let mut organ = Organ::new(name);
        for (ind, tag, value) in indicators {
            organ.add_indicator(Indicator::with_value(*ind, *tag, value.clone()).unwrap());
        }
        organ
    }

    fn rule(trigger: (&str, &str), target: (&str, &str), expr: &str) -> FormulaRule {
        FormulaRule::new(
            IndicatorRef::new(trigger.0, trigger.1),
            IndicatorRef::new(target.0, target.1),
            expr,
        )
    }

    /// heart.rate=60, lungs.capacity=6, brain.size=100 with the given rules.
    fn body(rules: Vec<FormulaRule>) -> Avatar {
        let mut avatar = Avatar::new(scripted());
        avatar.add_organ(organ("heart", &[("rate", TypeTag::Float, Value::Float(60.0))]));
        avatar.add_organ(organ(
            "lungs",
            &[("capacity", TypeTag::Float, Value::Float(6.0))],
        ));
        avatar.add_organ(organ("brain", &[("size", TypeTag::Float, Value::Float(100.0))]));
        for r in rules {
            avatar.add_formula(r);
        }
        avatar
    }

    fn scenario_rules() -> Vec<FormulaRule> {
        vec![
            rule(("heart", "rate"), ("lungs", "capacity"), "value + trigger_value"),
            rule(("heart", "rate"), ("brain", "size"), "trigger_value * 10"),
            rule(("lungs", "capacity"), ("brain", "size"), "value + trigger_value"),
        ]
    }

    #[test]
    fn transitive_scenario() {
        let mut avatar = body(scenario_rules());
        let report = avatar
            .update_indicator("heart", "rate", 70.0, true)
            .unwrap();

        assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(76.0));
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(776.0));
        assert_eq!(report.passes, 3);
        assert_eq!(
            report.changes,
            vec![
                Change {
                    pass: 1,
                    rule: 0,
                    target: IndicatorRef::new("lungs", "capacity"),
                    old: Value::Float(6.0),
                    new: Value::Float(76.0),
                },
                Change {
                    pass: 1,
                    rule: 1,
                    target: IndicatorRef::new("brain", "size"),
                    old: Value::Float(100.0),
                    new: Value::Float(700.0),
                },
                Change {
                    pass: 2,
                    rule: 2,
                    target: IndicatorRef::new("brain", "size"),
                    old: Value::Float(700.0),
                    new: Value::Float(776.0),
                },
            ]
        );
        let changed: Vec<String> = report.changed().iter().map(|r| r.to_string()).collect();
        assert_eq!(changed, vec!["lungs.capacity", "brain.size"]);
    }

    #[test]
    fn later_rule_wins_within_a_pass() {
        let mut avatar = body(vec![
            rule(("heart", "rate"), ("brain", "size"), "trigger_value * 10"),
            rule(("heart", "rate"), ("brain", "size"), "trigger_value"),
        ]);
        avatar.update_indicator("heart", "rate", 70.0, true).unwrap();
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(70.0));

        let mut avatar = body(vec![
            rule(("heart", "rate"), ("brain", "size"), "trigger_value"),
            rule(("heart", "rate"), ("brain", "size"), "trigger_value * 10"),
        ]);
        avatar.update_indicator("heart", "rate", 70.0, true).unwrap();
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(700.0));
    }

    #[test]
    fn later_rules_see_earlier_writes_in_same_pass() {
        let mut avatar = body(vec![
            rule(("heart", "rate"), ("heart", "rate"), "trigger_value * 10"),
            rule(("heart", "rate"), ("brain", "size"), "avatar.heart.rate * 2"),
        ]);
        // Pass 1 sets rate to 700 and the second rule reads it back.
        // Without a limit this would grow forever, so only run one pass.
        avatar.set_pass_limit(Some(1));
        let err = avatar
            .update_indicator("heart", "rate", 70.0, true)
            .unwrap_err();
        assert!(matches!(err, AvatarError::PassLimitExceeded { limit: 1 }));
        assert_eq!(avatar.value("heart", "rate").unwrap(), &Value::Float(700.0));
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(1400.0));
    }

    #[test]
    fn stable_propagation_is_idempotent() {
        let mut avatar = body(vec![rule(
            ("heart", "rate"),
            ("brain", "size"),
            "trigger_value * 10",
        )]);
        avatar.update_indicator("heart", "rate", 70.0, true).unwrap();
        let before = avatar.snapshot();

        let report = avatar
            .propagate(IndicatorRef::new("heart", "rate"))
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(report.passes, 1);
        assert_eq!(avatar.snapshot(), before);
    }

    #[test]
    fn self_loop_settles_at_fixed_point() {
        let mut avatar = body(vec![rule(
            ("brain", "size"),
            ("brain", "size"),
            "min(value + 1, 3)",
        )]);
        avatar.update_indicator("brain", "size", 0.0, true).unwrap();
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(3.0));
    }

    #[test]
    fn cycle_between_indicators_settles() {
        let mut avatar = body(vec![
            rule(("heart", "rate"), ("lungs", "capacity"), "trigger_value"),
            rule(("lungs", "capacity"), ("heart", "rate"), "trigger_value"),
        ]);
        let report = avatar
            .update_indicator("heart", "rate", 42.0, true)
            .unwrap();
        assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(42.0));
        assert_eq!(avatar.value("heart", "rate").unwrap(), &Value::Float(42.0));
        assert_eq!(report.changes.len(), 1);
    }

    #[test]
    fn oscillation_hits_explicit_pass_limit() {
        let mut avatar = Avatar::new(scripted());
        avatar.add_organ(organ("switch", &[("on", TypeTag::Bool, Value::Bool(false))]));
        avatar.add_formula(rule(("switch", "on"), ("switch", "on"), "not value"));
        avatar.set_pass_limit(Some(50));
        let err = avatar
            .update_indicator("switch", "on", true, true)
            .unwrap_err();
        assert!(matches!(err, AvatarError::PassLimitExceeded { limit: 50 }));
    }

    #[test]
    fn expression_error_keeps_earlier_writes() {
        let mut avatar = body(vec![
            rule(("heart", "rate"), ("lungs", "capacity"), "value + trigger_value"),
            rule(("heart", "rate"), ("brain", "size"), "value +* ("),
        ]);
        let err = avatar
            .update_indicator("heart", "rate", 70.0, true)
            .unwrap_err();
        match &err {
            AvatarError::Expression { expression, .. } => assert_eq!(expression, "value +* ("),
            other => panic!("expected Expression, got {:?}", other),
        }
        assert_eq!(avatar.value("heart", "rate").unwrap(), &Value::Float(70.0));
        assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(76.0));
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(100.0));
    }

    #[test]
    fn wrong_result_type_is_type_mismatch() {
        let mut avatar = body(vec![rule(
            ("heart", "rate"),
            ("brain", "size"),
            "str(trigger_value)",
        )]);
        let err = avatar
            .update_indicator("heart", "rate", 70.0, true)
            .unwrap_err();
        match err {
            AvatarError::TypeMismatch {
                indicator,
                expected,
                found,
            } => {
                assert_eq!(indicator, "size");
                assert_eq!(expected, TypeTag::Float);
                assert_eq!(found, TypeTag::Str);
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
        assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(100.0));
    }

    #[test]
    fn broken_reference_fails_when_fired() {
        let mut avatar = body(vec![
            rule(("heart", "rate"), ("lungs", "capacity"), "value + trigger_value"),
            rule(("heart", "rate"), ("liver", "mass"), "trigger_value"),
        ]);
        let err = avatar
            .update_indicator("heart", "rate", 70.0, true)
            .unwrap_err();
        match err {
            AvatarError::BrokenFormulaReference { rule, reference } => {
                assert_eq!(rule, 1);
                assert_eq!(reference, IndicatorRef::new("liver", "mass"));
            }
            other => panic!("expected BrokenFormulaReference, got {:?}", other),
        }
        assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(76.0));
    }

    #[test]
    fn unrelated_rules_do_not_fire() {
        let mut avatar = body(vec![rule(
            ("lungs", "capacity"),
            ("brain", "size"),
            "cannot be evaluated",
        )]);
        let report = avatar
            .update_indicator("heart", "rate", 70.0, true)
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(report.passes, 1);
    }
}
