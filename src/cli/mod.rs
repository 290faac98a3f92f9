//! Command-line interface for fleet-forge.
//!
//! Provides the `run` command that drives a full batch and a `check-config`
//! command that validates configuration without launching anything.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
