//! [`Avatar`] -- the root aggregate owning organs and formula rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AvatarError, Result};
use crate::eval::Evaluator;
use crate::indicator::Indicator;
use crate::organ::Organ;
use crate::propagation::PropagationReport;
use crate::rule::{FormulaRule, IndicatorRef};
use crate::schema::{CaseData, Schema};
use crate::value::{TypeTag, Value};

/// Current values keyed by organ, then indicator.
pub type Snapshot = BTreeMap<String, BTreeMap<String, Value>>;

/// An entity made of organs whose indicators are kept consistent by formulas.
///
/// The avatar is plain mutable state with no internal locking. Callers that
/// share one across threads must serialize [`update_indicator`](Self::update_indicator)
/// themselves, e.g. by holding it behind a single `Mutex`.
pub struct Avatar {
    pub(crate) organs: BTreeMap<String, Organ>,
    pub(crate) formulas: Vec<FormulaRule>,
    pub(crate) evaluator: Box<dyn Evaluator>,
    pub(crate) pass_limit: Option<usize>,
}

impl fmt::Debug for Avatar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Avatar")
            .field("organs", &self.organs)
            .field("formulas", &self.formulas)
            .field("pass_limit", &self.pass_limit)
            .finish_non_exhaustive()
    }
}

impl Avatar {
    /// Creates an empty avatar that evaluates formulas with `evaluator`.
    pub fn new(evaluator: impl Evaluator + 'static) -> Self {
        Self {
            organs: BTreeMap::new(),
            formulas: Vec::new(),
            evaluator: Box::new(evaluator),
            pass_limit: None,
        }
    }

    /// Builds an avatar from a schema.
    ///
    /// # Errors
    ///
    /// Returns [`AvatarError::UnknownType`] if an indicator declares a type
    /// outside the supported set, or [`AvatarError::TypeMismatch`] if a
    /// declared default does not match its type.
    pub fn from_schema(schema: &Schema, evaluator: impl Evaluator + 'static) -> Result<Self> {
        let mut avatar = Self::new(evaluator);
        avatar.apply_schema(schema)?;
        Ok(avatar)
    }

    /// Builds an avatar from a schema, then seeds it with case data.
    pub fn from_documents(
        schema: &Schema,
        case: &CaseData,
        evaluator: impl Evaluator + 'static,
    ) -> Result<Self> {
        let mut avatar = Self::from_schema(schema, evaluator)?;
        avatar.load_case_data(case)?;
        Ok(avatar)
    }

    /// Adds the organs and formulas declared by `schema`.
    ///
    /// Formula references are not checked here; a rule pointing at a missing
    /// indicator fails when it is evaluated. See [`check_formulas`](Self::check_formulas).
    pub fn apply_schema(&mut self, schema: &Schema) -> Result<()> {
        let mut organs = Vec::with_capacity(schema.organs.len());
        for (organ_name, organ_schema) in &schema.organs {
            let mut organ = Organ::new(organ_name.as_str());
            for (indicator_name, decl) in &organ_schema.indicators {
                let tag = TypeTag::from_identifier(&decl.data_type)
                    .ok_or_else(|| AvatarError::UnknownType(decl.data_type.clone()))?;
                let indicator = match &decl.default {
                    Some(initial) => {
                        Indicator::with_value(indicator_name.as_str(), tag, initial.clone())?
                    }
                    None => Indicator::new(indicator_name.as_str(), tag),
                };
                organ.add_indicator(indicator);
            }
            organs.push(organ);
        }

        for organ in organs {
            self.add_organ(organ);
        }
        self.formulas.extend(schema.formulas.iter().cloned());
        info!(
            organs = self.organs.len(),
            formulas = self.formulas.len(),
            "built avatar from schema"
        );
        Ok(())
    }

    /// Seeds indicator values without running formulas.
    ///
    /// Stops at the first unknown name or mismatched value; values loaded
    /// before that point are kept.
    pub fn load_case_data(&mut self, case: &CaseData) -> Result<()> {
        let mut loaded = 0usize;
        for (organ, indicator, value) in case.leaves() {
            self.update_indicator(organ, indicator, value.clone(), false)?;
            loaded += 1;
        }
        debug!(loaded, "loaded case data");
        Ok(())
    }

    /// Adds an organ. An existing organ with the same name is replaced.
    pub fn add_organ(&mut self, organ: Organ) {
        self.organs.insert(organ.name().to_owned(), organ);
    }

    /// Appends a formula rule to the end of the evaluation order.
    pub fn add_formula(&mut self, rule: FormulaRule) {
        self.formulas.push(rule);
    }

    /// Caps the number of propagation passes per update.
    ///
    /// `None` (the default) lets propagation run until no value changes.
    pub fn set_pass_limit(&mut self, limit: Option<usize>) {
        self.pass_limit = limit;
    }

    pub fn pass_limit(&self) -> Option<usize> {
        self.pass_limit
    }

    // -- Queries -------------------------------------------------------------

    pub fn organ(&self, name: &str) -> Result<&Organ> {
        self.organs
            .get(name)
            .ok_or_else(|| AvatarError::organ_not_found(name))
    }

    fn organ_mut(&mut self, name: &str) -> Result<&mut Organ> {
        self.organs
            .get_mut(name)
            .ok_or_else(|| AvatarError::organ_not_found(name))
    }

    /// Iterates organs in name order.
    pub fn organs(&self) -> impl Iterator<Item = &Organ> {
        self.organs.values()
    }

    /// Formula rules in evaluation order.
    pub fn formulas(&self) -> &[FormulaRule] {
        &self.formulas
    }

    pub fn indicator(&self, organ: &str, indicator: &str) -> Result<&Indicator> {
        self.organ(organ)?.indicator(indicator)
    }

    pub(crate) fn indicator_mut(&mut self, reference: &IndicatorRef) -> Result<&mut Indicator> {
        self.organ_mut(&reference.organ)?
            .indicator_mut(&reference.indicator)
    }

    /// Returns the current value of `organ.indicator`.
    pub fn value(&self, organ: &str, indicator: &str) -> Result<&Value> {
        Ok(self.indicator(organ, indicator)?.value())
    }

    /// Looks up an indicator by reference, returning `None` if it does not exist.
    pub fn resolve(&self, reference: &IndicatorRef) -> Option<&Indicator> {
        self.organs
            .get(&reference.organ)
            .and_then(|organ| organ.indicator(&reference.indicator).ok())
    }

    /// References to every indicator, in organ then indicator name order.
    pub fn indicator_refs(&self) -> Vec<IndicatorRef> {
        self.organs()
            .flat_map(|organ| {
                organ
                    .indicators()
                    .map(move |ind| IndicatorRef::new(organ.name(), ind.name()))
            })
            .collect()
    }

    /// Copies all current values into an ordered map.
    pub fn snapshot(&self) -> Snapshot {
        self.organs()
            .map(|organ| {
                let values = organ
                    .indicators()
                    .map(|ind| (ind.name().to_owned(), ind.value().clone()))
                    .collect();
                (organ.name().to_owned(), values)
            })
            .collect()
    }

    // -- Updates -------------------------------------------------------------

    /// Writes a new value into `organ.indicator`, then (optionally) runs formulas.
    ///
    /// Nothing is written if the names do not resolve or the value has the
    /// wrong type. With `apply_formulas == false` the returned report is empty.
    ///
    /// # Errors
    ///
    /// [`AvatarError::NotFound`] and [`AvatarError::TypeMismatch`] from the
    /// write itself, plus any error raised while propagating. A propagation
    /// error leaves every write made before it in place.
    pub fn update_indicator(
        &mut self,
        organ: &str,
        indicator: &str,
        value: impl Into<Value>,
        apply_formulas: bool,
    ) -> Result<PropagationReport> {
        let value = value.into();
        self.organ_mut(organ)?
            .indicator_mut(indicator)?
            .set(value)?;
        debug!(organ, indicator, apply_formulas, "updated indicator");

        if !apply_formulas {
            return Ok(PropagationReport::default());
        }
        self.propagate(IndicatorRef::new(organ, indicator))
    }

    // -- Checks --------------------------------------------------------------

    /// Reports formulas with unresolved references or rejected expressions.
    pub fn check_formulas(&self) -> Vec<FormulaIssue> {
        let mut issues = Vec::new();
        for (rule, formula) in self.formulas.iter().enumerate() {
            if self.resolve(&formula.trigger).is_none() {
                issues.push(FormulaIssue {
                    rule,
                    kind: FormulaIssueKind::MissingTrigger(formula.trigger.clone()),
                });
            }
            if self.resolve(&formula.target).is_none() {
                issues.push(FormulaIssue {
                    rule,
                    kind: FormulaIssueKind::MissingTarget(formula.target.clone()),
                });
            }
            if let Err(e) = self.evaluator.check(&formula.expression) {
                issues.push(FormulaIssue {
                    rule,
                    kind: FormulaIssueKind::InvalidExpression(e.to_string()),
                });
            }
        }
        issues
    }
}

/// A problem found by [`Avatar::check_formulas`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaIssue {
    /// Index of the rule in the formula sequence.
    pub rule: usize,
    pub kind: FormulaIssueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FormulaIssueKind {
    MissingTrigger(IndicatorRef),
    MissingTarget(IndicatorRef),
    InvalidExpression(String),
}

impl fmt::Display for FormulaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FormulaIssueKind::MissingTrigger(r) => {
                write!(f, "formula #{}: trigger {} does not exist", self.rule, r)
            }
            FormulaIssueKind::MissingTarget(r) => {
                write!(f, "formula #{}: target {} does not exist", self.rule, r)
            }
            FormulaIssueKind::InvalidExpression(msg) => {
                write!(f, "formula #{}: {}", self.rule, msg)
            }
        }
    }
}
