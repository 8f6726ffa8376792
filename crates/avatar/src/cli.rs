//! Clap CLI definitions for the `avatar` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// avatar -- organs, typed indicators and formula propagation.
///
/// Loads a schema of organs, indicators and formulas, seeds it with case
/// data, and propagates indicator updates through the formulas until
/// nothing changes.
#[derive(Parser, Debug)]
#[command(
    name = "avatar",
    about = "Propagate indicator updates through organ formulas",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (YAML or TOML).
    #[arg(long, global = true, env = "AVATAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the built-in heart/lungs/brain demonstration.
    Demo,

    /// Show indicator values.
    Show(ShowArgs),

    /// Set one indicator and propagate the change through the formulas.
    #[command(alias = "set")]
    Update(UpdateArgs),

    /// Check a schema's types and formulas without running them.
    Check(CheckArgs),

    /// Print version information.
    Version,

    /// Generate shell completions.
    Completion(CompletionArgs),
}

/// Schema and case-data inputs shared by several commands.
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Schema file (JSON, YAML or TOML).
    #[arg(long, short = 's')]
    pub schema: PathBuf,

    /// Case-data file with initial indicator values.
    #[arg(long, short = 'c')]
    pub case: Option<PathBuf>,
}

/// Arguments for `avatar show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub documents: DocumentArgs,

    /// Only show this organ.
    #[arg(long)]
    pub organ: Option<String>,
}

/// Arguments for `avatar update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub documents: DocumentArgs,

    /// Write the value without running formulas.
    #[arg(long)]
    pub no_formulas: bool,

    /// Abort propagation after this many passes (overrides config).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_passes: Option<u64>,

    /// Organ name.
    pub organ: String,

    /// Indicator name.
    pub indicator: String,

    /// New value as a JSON literal (`70.0`, `true`, `[1, 2]`); anything
    /// else is taken as a string.
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

/// Arguments for `avatar check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema file (JSON, YAML or TOML).
    #[arg(long, short = 's')]
    pub schema: PathBuf,
}

/// Arguments for `avatar completion`.
#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

/// Completion subcommands.
#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate Bash completions.
    Bash,
    /// Generate Zsh completions.
    Zsh,
    /// Generate Fish completions.
    Fish,
    /// Generate PowerShell completions.
    Powershell,
}
