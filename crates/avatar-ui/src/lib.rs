//! Terminal rendering for the avatar tools.
//!
//! Provides terminal detection and colored rendering of indicator values,
//! propagation changes and formula issues.

pub mod styles;
pub mod terminal;

pub use styles::Theme;
