//! Core error types.

use crate::rule::IndicatorRef;
use crate::value::TypeTag;

/// Boxed error returned by [`Evaluator`](crate::eval::Evaluator) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building, updating, or propagating an avatar.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    /// An organ or indicator name did not resolve.
    #[error("{entity} not found: {name}")]
    NotFound {
        /// The kind of entity (`"organ"` or `"indicator"`).
        entity: &'static str,
        /// The name that was looked up.
        name: String,
    },

    /// A value's variant does not match the indicator's declared type.
    #[error("type mismatch for indicator {indicator}: expected {expected}, got {found}")]
    TypeMismatch {
        /// Name of the indicator being written.
        indicator: String,
        /// The indicator's declared type.
        expected: TypeTag,
        /// The type of the rejected value.
        found: TypeTag,
    },

    /// The schema declared a type identifier outside the supported set.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A formula's trigger or target does not name an existing indicator.
    #[error("formula #{rule} references missing indicator {reference}")]
    BrokenFormulaReference {
        /// Index of the rule in the avatar's formula sequence.
        rule: usize,
        /// The reference that failed to resolve.
        reference: IndicatorRef,
    },

    /// The expression evaluator rejected or failed on a formula.
    #[error("failed to evaluate `{expression}`")]
    Expression {
        /// The formula expression.
        expression: String,
        /// The evaluator's error.
        #[source]
        source: BoxError,
    },

    /// Propagation ran past the configured pass limit.
    #[error("propagation did not settle within {limit} passes")]
    PassLimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Schema or case data could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, AvatarError>;

impl AvatarError {
    /// Creates an [`AvatarError::NotFound`] for an organ.
    pub fn organ_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "organ",
            name: name.into(),
        }
    }

    /// Creates an [`AvatarError::NotFound`] for an indicator.
    pub fn indicator_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "indicator",
            name: name.into(),
        }
    }

    /// Returns `true` if this is an [`AvatarError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an [`AvatarError::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}
