// src/cli.rs

//! CLI argument parsing using `clap`.

use std::num::NonZeroUsize;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `graphrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "graphrun",
    version,
    about = "Compile a TOML node graph and compute the requested targets.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph spec (TOML).
    ///
    /// Default: `Graph.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Graph.toml")]
    pub graph: String,

    /// Node to compute. Repeatable.
    ///
    /// If omitted, every node no other node depends on is a target.
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    /// Override `[config].max_workers`. Must be at least 1.
    #[arg(long, value_name = "N")]
    pub workers: Option<NonZeroUsize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GRAPHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution plan, but don't construct or
    /// invoke any component.
    #[arg(long)]
    pub dry_run: bool,

    /// Validate, then print the dependency graph in Graphviz DOT format
    /// instead of running it.
    #[arg(long, conflicts_with = "dry_run")]
    pub dot: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
