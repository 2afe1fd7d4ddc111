//! canarywatch command-line surface.
//!
//! The binary in `main.rs` is a thin wrapper: argument parsing lives in [`cli`],
//! each subcommand has a handler under [`commands`], and all console output
//! goes through [`output::OutputWriter`].

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
