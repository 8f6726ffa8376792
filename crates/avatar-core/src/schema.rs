//! Declarative schema and case-data documents.
//!
//! A [`Schema`] lists organs, their indicators' declared types, and the
//! formula rules linking them. [`CaseData`] carries initial indicator values.
//! Both can be read from JSON, YAML or TOML; the format is picked by file
//! extension, falling back to JSON, then YAML, then TOML.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AvatarError, Result};
use crate::rule::FormulaRule;
use crate::value::Value;

/// Root structure of a schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Organs keyed by name.
    #[serde(default)]
    pub organs: BTreeMap<String, OrganSchema>,

    /// Formula rules, in evaluation order.
    #[serde(default)]
    pub formulas: Vec<FormulaRule>,
}

/// One organ's indicator declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganSchema {
    #[serde(default)]
    pub indicators: BTreeMap<String, IndicatorSchema>,
}

/// Declaration of a single indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSchema {
    /// Type identifier, resolved through [`TypeTag::from_identifier`](crate::value::TypeTag::from_identifier).
    pub data_type: String,

    /// Initial value (None = zero value of the type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl IndicatorSchema {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            default: None,
        }
    }
}

/// Initial indicator values, applied without running formulas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseData {
    #[serde(default)]
    pub organs: BTreeMap<String, CaseOrgan>,
}

/// Initial values for one organ's indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseOrgan {
    #[serde(default)]
    pub indicators: BTreeMap<String, Value>,
}

impl CaseData {
    /// Iterates `(organ, indicator, value)` leaves in name order.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.organs.iter().flat_map(|(organ, data)| {
            data.indicators
                .iter()
                .map(move |(indicator, value)| (organ.as_str(), indicator.as_str(), value))
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a document from a JSON string.
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|e| AvatarError::Parse(e.to_string()))
}

/// Parse a document from a YAML string.
pub fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_yaml::from_str(content).map_err(|e| AvatarError::Parse(e.to_string()))
}

/// Parse a document from a TOML string.
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| AvatarError::Parse(e.to_string()))
}

/// Load a document from a file path (format by extension).
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content),
        Some("yaml" | "yml") => parse_yaml(&content),
        Some("toml") => parse_toml(&content),
        _ => parse_json(&content)
            .or_else(|_| parse_yaml(&content))
            .or_else(|_| parse_toml(&content)),
    }
}

/// Load a [`Schema`] from a file.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let schema = load_document(path)?;
    tracing::debug!(path = %path.display(), "loaded schema");
    Ok(schema)
}

/// Load [`CaseData`] from a file.
pub fn load_case_data(path: &Path) -> Result<CaseData> {
    let case = load_document(path)?;
    tracing::debug!(path = %path.display(), "loaded case data");
    Ok(case)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::IndicatorRef;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_schema_json() {
        let json = r#"{
            "organs": {
                "heart": {"indicators": {"rate": {"data_type": "float"}, "ecg": {"data_type": "list"}}},
                "lungs": {"indicators": {"capacity": {"data_type": "float", "default": 5.5}}}
            },
            "formulas": [
                {"trigger": ["heart", "rate"], "target": ["lungs", "capacity"], "expression": "value + trigger_value"}
            ]
        }"#;
        let schema: Schema = parse_json(json).unwrap();
        assert_eq!(schema.organs.len(), 2);
        assert_eq!(schema.organs["heart"].indicators["ecg"].data_type, "list");
        assert_eq!(
            schema.organs["lungs"].indicators["capacity"].default,
            Some(Value::Float(5.5))
        );
        assert_eq!(schema.formulas.len(), 1);
        assert_eq!(schema.formulas[0].trigger, IndicatorRef::new("heart", "rate"));
    }

    #[test]
    fn parse_schema_toml() {
        let toml_str = r#"
[organs.heart.indicators.rate]
data_type = "float"

[organs.brain.indicators.size]
data_type = "float"

[[formulas]]
trigger = ["heart", "rate"]
target = ["brain", "size"]
expression = "trigger_value * 10"
"#;
        let schema: Schema = parse_toml(toml_str).unwrap();
        assert_eq!(schema.organs.len(), 2);
        assert_eq!(schema.formulas[0].expression, "trigger_value * 10");
    }

    #[test]
    fn parse_schema_yaml_without_formulas() {
        let yaml = "organs:\n  heart:\n    indicators:\n      rate:\n        data_type: float\n";
        let schema: Schema = parse_yaml(yaml).unwrap();
        assert!(schema.formulas.is_empty());
        assert_eq!(schema.organs["heart"].indicators["rate"], IndicatorSchema::new("float"));
    }

    #[test]
    fn parse_case_data_leaves() {
        let json = r#"{
            "organs": {
                "heart": {"indicators": {"rate": 60.0, "ecg": [1, 2, 3]}},
                "lungs": {"indicators": {"capacity": 6.0}}
            }
        }"#;
        let case: CaseData = parse_json(json).unwrap();
        let leaves: Vec<_> = case.leaves().collect();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[0].0, "heart");
        assert_eq!(leaves[0].1, "ecg");
        assert_eq!(
            leaves[0].2,
            &Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(leaves[2], ("lungs", "capacity", &Value::Float(6.0)));
    }

    #[test]
    fn case_data_rejects_null() {
        let json = r#"{"organs": {"heart": {"indicators": {"rate": null}}}}"#;
        let err = parse_json::<CaseData>(json).unwrap_err();
        assert!(matches!(err, AvatarError::Parse(_)));
    }

    #[test]
    fn load_document_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.yaml");
        std::fs::write(&path, "organs:\n  heart:\n    indicators:\n      rate: 72.5\n").unwrap();
        let case = load_case_data(&path).unwrap();
        assert_eq!(case.organs["heart"].indicators["rate"], Value::Float(72.5));
    }

    #[test]
    fn load_document_guesses_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.txt");
        std::fs::write(&path, "organs:\n  heart:\n    indicators:\n      rate:\n        data_type: float\n").unwrap();
        let schema = load_schema(&path).unwrap();
        assert!(schema.organs.contains_key("heart"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_schema(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(matches!(err, AvatarError::Io(_)));
    }
}
