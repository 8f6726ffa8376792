//! `avatar show` -- print indicator values.

use std::collections::HashSet;

use anyhow::Result;

use crate::cli::ShowArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_lines, render_values};

/// Execute the `avatar show` command.
pub fn run(ctx: &RuntimeContext, args: &ShowArgs) -> Result<()> {
    let avatar = ctx.load_avatar(&args.documents)?;

    if ctx.json {
        let mut snapshot = avatar.snapshot();
        if let Some(name) = &args.organ {
            avatar.organ(name)?;
            snapshot.retain(|organ, _| organ == name);
        }
        return output_json(&snapshot);
    }

    let lines = render_values(ctx, &avatar, args.organ.as_deref(), &HashSet::new())?;
    print_lines(&lines);
    Ok(())
}
