//! End-to-end propagation driven by the formula language.

use avatar_core::avatar::Avatar;
use avatar_core::error::AvatarError;
use avatar_core::rule::IndicatorRef;
use avatar_core::schema::{CaseData, Schema, parse_json, parse_yaml};
use avatar_core::value::Value;
use avatar_formula::FormulaEvaluator;
use pretty_assertions::assert_eq;

fn build(schema: &str, case: &str) -> Avatar {
    let schema: Schema = parse_json(schema).unwrap();
    let case: CaseData = parse_json(case).unwrap();
    Avatar::from_documents(&schema, &case, FormulaEvaluator::new()).unwrap()
}

const BODY_CASE: &str = r#"{
    "organs": {
        "heart": {"indicators": {"rate": 60.0, "ecg": [1, 2, 3]}},
        "lungs": {"indicators": {"capacity": 6.0}},
        "brain": {"indicators": {"size": 100.0}}
    }
}"#;

fn body_schema(formulas: &str) -> String {
    format!(
        r#"{{
        "organs": {{
            "heart": {{"indicators": {{"rate": {{"data_type": "float"}}, "ecg": {{"data_type": "list"}}}}}},
            "lungs": {{"indicators": {{"capacity": {{"data_type": "float"}}}}}},
            "brain": {{"indicators": {{"size": {{"data_type": "float"}}}}}}
        }},
        "formulas": {formulas}
    }}"#
    )
}

#[test]
fn heart_rate_update_reaches_brain_through_lungs() {
    let schema = body_schema(
        r#"[
            {"trigger": ["heart", "rate"], "target": ["lungs", "capacity"], "expression": "value + trigger_value"},
            {"trigger": ["heart", "rate"], "target": ["brain", "size"], "expression": "trigger_value * 10"},
            {"trigger": ["lungs", "capacity"], "target": ["brain", "size"], "expression": "value + trigger_value"}
        ]"#,
    );
    let mut avatar = build(&schema, BODY_CASE);

    let report = avatar.update_indicator("heart", "rate", 70.0, true).unwrap();

    assert_eq!(avatar.value("heart", "rate").unwrap(), &Value::Float(70.0));
    assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(76.0));
    assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(776.0));
    assert_eq!(report.passes, 3);
    assert_eq!(
        report.changed(),
        vec![
            &IndicatorRef::new("lungs", "capacity"),
            &IndicatorRef::new("brain", "size"),
        ]
    );
    assert_eq!(report.changes.len(), 3);
}

#[test]
fn demo_rules_append_to_ecg() {
    let schema = body_schema(
        r#"[
            {"trigger": ["heart", "rate"], "target": ["lungs", "capacity"], "expression": "value + trigger_value"},
            {"trigger": ["heart", "rate"], "target": ["heart", "ecg"], "expression": "[*value, 1]"},
            {"trigger": ["heart", "rate"], "target": ["brain", "size"], "expression": "value * 10"},
            {"trigger": ["lungs", "capacity"], "target": ["brain", "size"], "expression": "value + trigger_value"}
        ]"#,
    );
    let mut avatar = build(&schema, BODY_CASE);

    avatar.update_indicator("heart", "rate", 70.0, true).unwrap();

    assert_eq!(
        avatar.value("heart", "ecg").unwrap(),
        &Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(1)])
    );
    assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(76.0));
    assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(1076.0));
}

#[test]
fn settled_avatar_does_not_change_on_rerun() {
    let schema = body_schema(
        r#"[{"trigger": ["heart", "rate"], "target": ["lungs", "capacity"], "expression": "trigger_value / 10"}]"#,
    );
    let mut avatar = build(&schema, BODY_CASE);

    avatar.update_indicator("heart", "rate", 70.0, true).unwrap();
    let before = avatar.snapshot();
    let report = avatar.propagate(IndicatorRef::new("heart", "rate")).unwrap();

    assert!(report.is_empty());
    assert_eq!(avatar.snapshot(), before);
}

#[test]
fn malformed_expression_keeps_earlier_writes() {
    let schema = body_schema(
        r#"[
            {"trigger": ["heart", "rate"], "target": ["lungs", "capacity"], "expression": "trigger_value + 1"},
            {"trigger": ["heart", "rate"], "target": ["brain", "size"], "expression": "value +* ("}
        ]"#,
    );
    let mut avatar = build(&schema, BODY_CASE);

    let err = avatar.update_indicator("heart", "rate", 70.0, true).unwrap_err();

    match err {
        AvatarError::Expression { expression, .. } => assert_eq!(expression, "value +* ("),
        other => panic!("expected Expression, got {:?}", other),
    }
    assert_eq!(avatar.value("heart", "rate").unwrap(), &Value::Float(70.0));
    assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(71.0));
    assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(100.0));
}

#[test]
fn formulas_read_other_indicators_through_avatar() {
    let schema = body_schema(
        r#"[{"trigger": ["lungs", "capacity"], "target": ["brain", "size"],
             "expression": "avatar.heart.rate * trigger_value if len(avatar.heart.ecg) > 2 else value"}]"#,
    );
    let mut avatar = build(&schema, BODY_CASE);

    avatar.update_indicator("lungs", "capacity", 2.0, true).unwrap();

    assert_eq!(avatar.value("brain", "size").unwrap(), &Value::Float(120.0));
}

#[test]
fn formula_result_of_wrong_type_is_rejected() {
    let schema = body_schema(
        r#"[{"trigger": ["heart", "rate"], "target": ["lungs", "capacity"], "expression": "str(trigger_value)"}]"#,
    );
    let mut avatar = build(&schema, BODY_CASE);

    let err = avatar.update_indicator("heart", "rate", 70.0, true).unwrap_err();

    assert!(err.is_type_mismatch(), "got {err:?}");
    assert_eq!(avatar.value("lungs", "capacity").unwrap(), &Value::Float(6.0));
}

#[test]
fn check_formulas_reports_unknown_names_and_references() {
    let schema: Schema = parse_yaml(
        r#"
organs:
  heart:
    indicators:
      rate: {data_type: float}
formulas:
  - trigger: [heart, rate]
    target: [heart, rate]
    expression: "import_module('os')"
  - trigger: [heart, rate]
    target: [brain, size]
    expression: "value"
"#,
    )
    .unwrap();
    let avatar = Avatar::from_schema(&schema, FormulaEvaluator::new()).unwrap();

    let issues: Vec<String> = avatar
        .check_formulas()
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(
        issues,
        vec![
            "formula #0: unknown function: import_module".to_string(),
            "formula #1: target brain.size does not exist".to_string(),
        ]
    );
}
