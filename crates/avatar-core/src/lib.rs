//! Core types for the avatar system.
//!
//! An [`Avatar`](avatar::Avatar) is made of named [organs](organ::Organ), each
//! holding typed [indicators](indicator::Indicator). [Formula rules](rule::FormulaRule)
//! link indicators: when a rule's trigger changes, its expression is evaluated
//! and the result written to its target, transitively, until nothing changes
//! (see [`propagation`]).
//!
//! Expressions are evaluated through the [`Evaluator`](eval::Evaluator) trait;
//! the `avatar-formula` crate provides the standard implementation.

pub mod avatar;
pub mod error;
pub mod eval;
pub mod indicator;
pub mod organ;
pub mod propagation;
pub mod rule;
pub mod schema;
pub mod value;
