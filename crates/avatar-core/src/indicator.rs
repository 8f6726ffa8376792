//! Typed value cells.

use crate::error::{AvatarError, Result};
use crate::value::{TypeTag, Value};

/// A named value whose variant is fixed by its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    name: String,
    declared_type: TypeTag,
    value: Value,
}

impl Indicator {
    /// Creates an indicator holding the zero value of `declared_type`.
    pub fn new(name: impl Into<String>, declared_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            declared_type,
            value: declared_type.zero_value(),
        }
    }

    /// Creates an indicator with an explicit initial value.
    ///
    /// # Errors
    ///
    /// Returns [`AvatarError::TypeMismatch`] if `value` does not conform to
    /// `declared_type`.
    pub fn with_value(
        name: impl Into<String>,
        declared_type: TypeTag,
        value: Value,
    ) -> Result<Self> {
        let mut indicator = Self::new(name, declared_type);
        indicator.set(value)?;
        Ok(indicator)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> TypeTag {
        self.declared_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Checks `value` against the declared type without storing it.
    pub fn check(&self, value: &Value) -> Result<()> {
        if value.conforms_to(self.declared_type) {
            Ok(())
        } else {
            Err(AvatarError::TypeMismatch {
                indicator: self.name.clone(),
                expected: self.declared_type,
                found: value.type_tag(),
            })
        }
    }

    /// Replaces the current value, returning the previous one.
    ///
    /// On a type mismatch the stored value is left untouched.
    pub fn set(&mut self, value: Value) -> Result<Value> {
        self.check(&value)?;
        Ok(std::mem::replace(&mut self.value, value))
    }
}
