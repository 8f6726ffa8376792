//! Formula rules and the indicator references they link.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one indicator by `(organ, indicator)` name.
///
/// Serialized as a two-element array, e.g. `["heart", "rate"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct IndicatorRef {
    pub organ: String,
    pub indicator: String,
}

impl IndicatorRef {
    pub fn new(organ: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            organ: organ.into(),
            indicator: indicator.into(),
        }
    }
}

impl From<(String, String)> for IndicatorRef {
    fn from((organ, indicator): (String, String)) -> Self {
        Self { organ, indicator }
    }
}

impl From<IndicatorRef> for (String, String) {
    fn from(r: IndicatorRef) -> Self {
        (r.organ, r.indicator)
    }
}

impl fmt::Display for IndicatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.organ, self.indicator)
    }
}

/// A declarative `trigger -> target` link.
///
/// Whenever the trigger indicator changes, `expression` is evaluated and its
/// result becomes the target's new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRule {
    /// Indicator whose change fires this rule.
    pub trigger: IndicatorRef,

    /// Indicator that receives the evaluated value.
    pub target: IndicatorRef,

    /// Expression evaluated with `avatar`, `value` and `trigger_value` bound.
    pub expression: String,
}

impl FormulaRule {
    pub fn new(trigger: IndicatorRef, target: IndicatorRef, expression: impl Into<String>) -> Self {
        Self {
            trigger,
            target,
            expression: expression.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rule_json() {
        let json = r#"{
            "trigger": ["heart", "rate"],
            "target": ["lungs", "capacity"],
            "expression": "value + trigger_value"
        }"#;
        let rule: FormulaRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.trigger, IndicatorRef::new("heart", "rate"));
        assert_eq!(rule.target, IndicatorRef::new("lungs", "capacity"));
        assert_eq!(rule.expression, "value + trigger_value");
    }

    #[test]
    fn reference_serializes_as_pair() {
        let r = IndicatorRef::new("brain", "size");
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"["brain","size"]"#);
        assert_eq!(r.to_string(), "brain.size");
    }

    #[test]
    fn reference_rejects_wrong_arity() {
        assert!(serde_json::from_str::<IndicatorRef>(r#"["heart"]"#).is_err());
        assert!(serde_json::from_str::<IndicatorRef>(r#"["a", "b", "c"]"#).is_err());
    }
}
