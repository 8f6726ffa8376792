//! `avatar update` -- set one indicator and propagate the change.

use std::collections::HashSet;

use anyhow::{Context, Result};
use avatar_core::avatar::Snapshot;
use avatar_core::propagation::{Change, PropagationReport};
use avatar_core::rule::IndicatorRef;
use avatar_core::value::{TypeTag, Value};
use serde::Serialize;
use tracing::info;

use crate::cli::UpdateArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_lines, render_report, render_values};

#[derive(Serialize)]
struct UpdateOutput<'a> {
    updated: IndicatorRef,
    value: &'a Value,
    passes: usize,
    changes: &'a [Change],
    values: Snapshot,
}

/// Execute the `avatar update` command.
pub fn run(ctx: &RuntimeContext, args: &UpdateArgs) -> Result<()> {
    let mut avatar = ctx.load_avatar(&args.documents)?;
    if let Some(limit) = args.max_passes {
        avatar.set_pass_limit(Some(usize::try_from(limit)?));
    }

    let declared = avatar
        .indicator(&args.organ, &args.indicator)?
        .declared_type();
    let value = parse_value(&args.value, declared);

    let report: PropagationReport = avatar
        .update_indicator(&args.organ, &args.indicator, value.clone(), !args.no_formulas)
        .with_context(|| format!("updating {}.{}", args.organ, args.indicator))?;
    info!(
        organ = %args.organ,
        indicator = %args.indicator,
        passes = report.passes,
        changes = report.changes.len(),
        "update applied"
    );

    let origin = IndicatorRef::new(&args.organ, &args.indicator);
    if ctx.json {
        return output_json(&UpdateOutput {
            value: &value,
            passes: report.passes,
            changes: &report.changes,
            values: avatar.snapshot(),
            updated: origin,
        });
    }
    if ctx.quiet {
        return Ok(());
    }

    let mut changed: HashSet<&IndicatorRef> = report.changed().into_iter().collect();
    changed.insert(&origin);

    let mut lines = vec![format!("{} = {}", origin, ctx.theme.value(&value))];
    if !args.no_formulas {
        lines.extend(render_report(ctx, &report));
    }
    lines.push(String::new());
    lines.extend(render_values(ctx, &avatar, None, &changed)?);
    print_lines(&lines);
    Ok(())
}

/// Parses a command-line value as a JSON literal, falling back to a string.
///
/// Whole numbers given for a float indicator are widened, and anything given
/// for a string indicator is kept verbatim.
fn parse_value(raw: &str, declared: TypeTag) -> Value {
    if declared == TypeTag::Str {
        return Value::Str(raw.to_string());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Int(i)) if declared == TypeTag::Float => Value::Float(i as f64),
        Ok(value) => value,
        Err(_) => Value::Str(raw.to_string()),
    }
}
