//! `avatar demo` -- the built-in heart/lungs/brain walkthrough.
//!
//! Loads the bundled schema and case data, raises the heart rate from 60 to
//! 70, and shows how the change flows into the lungs, the ECG trace and the
//! brain.

use std::collections::HashSet;

use anyhow::{Context, Result};
use avatar_core::avatar::Avatar;
use avatar_core::rule::IndicatorRef;
use avatar_core::schema::{CaseData, Schema, parse_yaml};
use avatar_core::value::Value;

use crate::context::RuntimeContext;
use crate::output::{output_json, print_lines, render_report, render_values};

const SCHEMA: &str = include_str!("../../demos/body.schema.yaml");
const CASE: &str = include_str!("../../demos/body.case.yaml");

const NEW_RATE: f64 = 70.0;

/// Builds the demo avatar with its initial values.
pub fn build(ctx: &RuntimeContext) -> Result<Avatar> {
    let schema: Schema = parse_yaml(SCHEMA).context("parsing bundled demo schema")?;
    let case: CaseData = parse_yaml(CASE).context("parsing bundled demo case data")?;
    let mut avatar = ctx.new_avatar();
    avatar.apply_schema(&schema)?;
    avatar.load_case_data(&case)?;
    Ok(avatar)
}

/// Execute the `avatar demo` command.
pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let mut avatar = build(ctx)?;
    let initial = avatar.snapshot();
    let initial_lines = render_values(ctx, &avatar, None, &HashSet::new())?;

    let report = avatar.update_indicator("heart", "rate", NEW_RATE, true)?;

    if ctx.json {
        return output_json(&serde_json::json!({
            "initial": initial,
            "update": {
                "target": IndicatorRef::new("heart", "rate"),
                "value": Value::Float(NEW_RATE),
            },
            "report": report,
            "updated": avatar.snapshot(),
        }));
    }

    let origin = IndicatorRef::new("heart", "rate");
    let mut changed: HashSet<&IndicatorRef> = report.changed().into_iter().collect();
    changed.insert(&origin);

    let mut lines = vec!["Initial values:".to_string()];
    lines.extend(initial_lines);
    lines.push(String::new());
    lines.push(format!(
        "Setting {} = {}",
        origin,
        ctx.theme.value(&Value::Float(NEW_RATE))
    ));
    lines.extend(render_report(ctx, &report));
    lines.push(String::new());
    lines.push("Updated values:".to_string());
    lines.extend(render_values(ctx, &avatar, None, &changed)?);
    print_lines(&lines);
    Ok(())
}
