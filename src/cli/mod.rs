//! CLI module for verimath - command-line interface and subcommands.
//!
//! Provides subcommands for running the pipeline, previewing plans and
//! managing stored pairs.

pub mod commands;

pub use commands::Cli;
