//! Typed indicator values.
//!
//! [`Value`] is the tagged union stored in every indicator and produced by
//! formula evaluation. [`TypeTag`] names one of its variants and is what a
//! schema declares for an indicator.
//!
//! Type identifiers coming from schema files are resolved through the closed
//! table in [`TypeTag::from_identifier`]; nothing else can produce a tag.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// The declared type of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Float,
    Int,
    Bool,
    Str,
    List,
}

/// Schema identifiers accepted for each tag.
const TYPE_TABLE: &[(&str, TypeTag)] = &[
    ("float", TypeTag::Float),
    ("int", TypeTag::Int),
    ("bool", TypeTag::Bool),
    ("str", TypeTag::Str),
    ("list", TypeTag::List),
];

impl TypeTag {
    /// Every supported tag, in declaration order.
    pub const ALL: [TypeTag; 5] = [
        TypeTag::Float,
        TypeTag::Int,
        TypeTag::Bool,
        TypeTag::Str,
        TypeTag::List,
    ];

    /// Resolves a schema type identifier (`"float"`, `"list"`, ...).
    ///
    /// Returns `None` for anything outside the fixed table.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        TYPE_TABLE
            .iter()
            .find(|(name, _)| *name == identifier)
            .map(|(_, tag)| *tag)
    }

    /// Returns the schema identifier for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::List => "list",
        }
    }

    /// The value an indicator of this type starts with.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Float => Value::Float(0.0),
            Self::Int => Value::Int(0),
            Self::Bool => Value::Bool(false),
            Self::Str => Value::Str(String::new()),
            Self::List => Value::List(Vec::new()),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_identifier(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A typed indicator value.
///
/// Serialized untagged, so `60.0` is a `Float`, `60` an `Int`, `[1, 2]` a
/// `List` and so on. Equality only holds between values of the same variant:
/// `Float(1.0) != Int(1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Returns the tag of this value's variant.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Float(_) => TypeTag::Float,
            Self::Int(_) => TypeTag::Int,
            Self::Bool(_) => TypeTag::Bool,
            Self::Str(_) => TypeTag::Str,
            Self::List(_) => TypeTag::List,
        }
    }

    /// Returns `true` if this value may be stored in an indicator of `tag`.
    pub fn conforms_to(&self, tag: TypeTag) -> bool {
        self.type_tag() == tag
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug keeps the trailing `.0` on whole floats.
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Self::Str(s) => write!(f, "{s:?}")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}
