//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: the
//! loaded configuration, the output mode, and the terminal theme.

use std::path::Path;

use anyhow::{Context, Result};
use avatar_config::{AvatarConfig, load_config};
use avatar_core::avatar::Avatar;
use avatar_core::schema::{CaseData, load_case_data, load_schema};
use avatar_formula::FormulaEvaluator;
use avatar_ui::Theme;
use avatar_ui::terminal::{color_enabled, should_use_emoji};
use tracing::debug;

use crate::cli::{DocumentArgs, GlobalArgs};

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    pub config: AvatarConfig,

    /// Whether to produce JSON output (`--json` or `output.json`).
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    pub theme: Theme,

    /// Print organ icons in headings.
    pub emoji: bool,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments and configuration.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global.config.as_deref()).with_context(|| match &global.config {
            Some(path) => format!("loading config {}", path.display()),
            None => "loading config from environment".to_string(),
        })?;
        Ok(Self::with_config(global, config))
    }

    /// Build a `RuntimeContext` from an already loaded configuration.
    pub fn with_config(global: &GlobalArgs, config: AvatarConfig) -> Self {
        let json = global.json || config.output.json;
        Self {
            json,
            verbose: global.verbose,
            quiet: global.quiet,
            theme: Theme::new(!json && color_enabled(config.output.color)),
            emoji: !json && should_use_emoji(),
            config,
        }
    }

    /// The `tracing` filter to install: verbose and quiet flags win over
    /// the configured filter.
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "avatar=debug,avatar_core=debug,avatar_formula=debug,avatar_config=debug"
        } else if self.quiet {
            "error"
        } else {
            &self.config.log.filter
        }
    }

    /// Builds an avatar wired to the formula language and configured pass limit.
    pub fn new_avatar(&self) -> Avatar {
        let mut avatar = Avatar::new(FormulaEvaluator::new());
        avatar.set_pass_limit(self.config.propagation.max_passes);
        avatar
    }

    /// Loads the schema and (optional) case data named on the command line.
    pub fn load_avatar(&self, documents: &DocumentArgs) -> Result<Avatar> {
        let schema = load_schema(&documents.schema)
            .with_context(|| format!("loading schema {}", documents.schema.display()))?;
        let case = match &documents.case {
            Some(path) => load_case(path)?,
            None => CaseData::default(),
        };

        let mut avatar = self.new_avatar();
        avatar
            .apply_schema(&schema)
            .with_context(|| format!("building avatar from {}", documents.schema.display()))?;
        avatar
            .load_case_data(&case)
            .context("applying case data")?;
        debug!(
            organs = avatar.organs().count(),
            formulas = avatar.formulas().len(),
            "avatar ready"
        );
        Ok(avatar)
    }
}

fn load_case(path: &Path) -> Result<CaseData> {
    load_case_data(path).with_context(|| format!("loading case data {}", path.display()))
}
