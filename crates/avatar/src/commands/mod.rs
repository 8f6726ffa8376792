//! Command handlers, one module per subcommand.

pub mod check;
pub mod completion;
pub mod demo;
pub mod show;
pub mod update;
pub mod version;
