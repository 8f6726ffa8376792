//! `avatar` -- organ/indicator model with formula propagation.
//!
//! Parses CLI arguments with clap, loads configuration, installs logging,
//! and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    let cli = Cli::parse();

    let result = RuntimeContext::from_global_args(&cli.global).and_then(|ctx| {
        init_logging(&ctx);
        dispatch(&ctx, cli.command)
    });

    // Handle errors: print message and exit with code 1
    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr. `RUST_LOG` overrides the computed filter.
fn init_logging(ctx: &RuntimeContext) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(ctx.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(ctx: &RuntimeContext, command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Demo) => commands::demo::run(ctx),
        Some(Commands::Show(args)) => commands::show::run(ctx, &args),
        Some(Commands::Update(args)) => commands::update::run(ctx, &args),
        Some(Commands::Check(args)) => commands::check::run(ctx, &args),
        Some(Commands::Version) => commands::version::run(ctx),
        Some(Commands::Completion(args)) => commands::completion::run(ctx, &args),
        None => {
            // No subcommand -- print help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}
