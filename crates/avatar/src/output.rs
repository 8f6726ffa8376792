//! Output formatting helpers for the `avatar` CLI.

use std::collections::HashSet;
use std::io::{self, Write};

use anyhow::Result;
use avatar_core::avatar::Avatar;
use avatar_core::propagation::PropagationReport;
use avatar_core::rule::IndicatorRef;
use serde::Serialize;

use crate::context::RuntimeContext;

/// Print a value as pretty JSON on stdout.
pub fn output_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Ignore broken pipe errors (e.g., piped to `head`)
    let _ = writeln!(handle, "{}", json);
    Ok(())
}

/// Render every organ (or just `only`) with its indicators.
///
/// Indicators in `changed` are highlighted.
pub fn render_values(
    ctx: &RuntimeContext,
    avatar: &Avatar,
    only: Option<&str>,
    changed: &HashSet<&IndicatorRef>,
) -> Result<Vec<String>> {
    let organs = match only {
        Some(name) => vec![avatar.organ(name)?],
        None => avatar.organs().collect(),
    };

    let mut lines = Vec::new();
    for organ in organs {
        lines.push(ctx.theme.organ_heading(organ.name(), ctx.emoji));
        for indicator in organ.indicators() {
            let key = IndicatorRef::new(organ.name(), indicator.name());
            lines.push(ctx.theme.indicator_line(
                indicator.name(),
                indicator.value(),
                changed.contains(&key),
            ));
        }
    }
    Ok(lines)
}

/// Render the writes of a propagation run, one per line.
pub fn render_report(ctx: &RuntimeContext, report: &PropagationReport) -> Vec<String> {
    if report.is_empty() {
        return vec![ctx.theme.muted("no formula changed any value")];
    }
    report
        .changes
        .iter()
        .map(|change| format!("  {}", ctx.theme.change(change)))
        .collect()
}

pub fn print_lines(lines: &[String]) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for line in lines {
        let _ = writeln!(handle, "{}", line);
    }
}
