//! Command-line interface

pub mod args;
pub mod commands;
pub mod router;

pub use args::{Cli, Commands, RunsCommands};
pub use router::execute_command;
