//! Named groups of indicators.

use std::collections::BTreeMap;

use crate::error::{AvatarError, Result};
use crate::indicator::Indicator;

/// A named collection of indicators, keyed by indicator name.
#[derive(Debug, Clone, PartialEq)]
pub struct Organ {
    name: String,
    indicators: BTreeMap<String, Indicator>,
}

impl Organ {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indicators: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds an indicator. An existing indicator with the same name is replaced.
    pub fn add_indicator(&mut self, indicator: Indicator) {
        self.indicators
            .insert(indicator.name().to_owned(), indicator);
    }

    pub fn indicator(&self, name: &str) -> Result<&Indicator> {
        self.indicators
            .get(name)
            .ok_or_else(|| AvatarError::indicator_not_found(format!("{}.{}", self.name, name)))
    }

    pub fn indicator_mut(&mut self, name: &str) -> Result<&mut Indicator> {
        let organ = &self.name;
        self.indicators
            .get_mut(name)
            .ok_or_else(|| AvatarError::indicator_not_found(format!("{organ}.{name}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indicators.contains_key(name)
    }

    /// Iterates indicators in name order.
    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.indicators.values()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}
