//! `avatar check` -- validate a schema without running any formula.

use anyhow::{Result, bail};
use avatar_core::avatar::Avatar;
use serde::Serialize;
use tracing::debug;

use crate::cli::{CheckArgs, DocumentArgs};
use crate::context::RuntimeContext;
use crate::output::{output_json, print_lines};

#[derive(Debug, Serialize, PartialEq)]
struct Summary {
    organs: usize,
    indicators: usize,
    formulas: usize,
}

fn summarize(avatar: &Avatar) -> Summary {
    Summary {
        organs: avatar.organs().count(),
        indicators: avatar.organs().map(|o| o.len()).sum(),
        formulas: avatar.formulas().len(),
    }
}

/// Execute the `avatar check` command.
///
/// Type errors in the schema fail while loading. Formula issues are listed
/// and make the command exit with status 1.
pub fn run(ctx: &RuntimeContext, args: &CheckArgs) -> Result<()> {
    let documents = DocumentArgs {
        schema: args.schema.clone(),
        case: None,
    };
    let avatar = ctx.load_avatar(&documents)?;
    let summary = summarize(&avatar);
    let issues = avatar.check_formulas();
    for issue in &issues {
        debug!(rule = issue.rule, "{}", issue);
    }

    if ctx.json {
        output_json(&serde_json::json!({
            "ok": issues.is_empty(),
            "summary": summary,
            "issues": issues,
        }))?;
    } else if issues.is_empty() {
        if !ctx.quiet {
            println!(
                "{}",
                ctx.theme.ok(&format!(
                    "{}: {} organs, {} indicators, {} formulas",
                    args.schema.display(),
                    summary.organs,
                    summary.indicators,
                    summary.formulas
                ))
            );
        }
    } else {
        let lines: Vec<String> = issues.iter().map(|issue| ctx.theme.issue(issue)).collect();
        print_lines(&lines);
    }

    if !issues.is_empty() {
        bail!(
            "{} formula issue(s) in {}",
            issues.len(),
            args.schema.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_core::schema::{Schema, parse_yaml};
    use avatar_formula::FormulaEvaluator;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_counts_every_indicator() {
        let schema: Schema = parse_yaml(include_str!("../../demos/body.schema.yaml")).unwrap();
        let avatar = Avatar::from_schema(&schema, FormulaEvaluator::new()).unwrap();
        assert_eq!(
            summarize(&avatar),
            Summary {
                organs: 3,
                indicators: 4,
                formulas: 4,
            }
        );
    }
}
