//! CLI module for babysitter - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
