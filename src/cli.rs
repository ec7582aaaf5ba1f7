// src/cli.rs
//! CLI definitions for the package list generator
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pkglistgen")]
#[command(version)]
#[command(about = "Generate product package lists from group definitions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Solve all group definitions and write the output documents
    Solve(SolveArgs),

    /// Write skeleton .group documents for groups that have none yet
    Stubs(StubsArgs),
}

#[derive(Args)]
pub struct SolveArgs {
    /// Directory with group*.yml, supportstatus.txt and unneeded.yml
    #[arg(short, long, default_value = ".")]
    pub input_dir: String,

    /// Directory the generated documents are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,

    /// JSON repository index describing the package universe
    #[arg(short, long)]
    pub repository: String,

    /// Repository snapshot state the index must match
    #[arg(long)]
    pub state: Option<String>,

    /// Restrict solving to these architectures (default: all configured)
    #[arg(short, long = "arch")]
    pub architectures: Vec<String>,

    /// Locales fed into the supplement coverage check
    #[arg(long = "locale")]
    pub locales: Vec<String>,

    /// Do not expand recommended packages by default
    #[arg(long)]
    pub no_recommends: bool,

    /// Render broken packages as comments instead of error markers
    #[arg(long)]
    pub ignore_broken: bool,
}

#[derive(Args)]
pub struct StubsArgs {
    /// Directory with group*.yml files
    #[arg(short, long, default_value = ".")]
    pub input_dir: String,

    /// Directory the stub documents are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,
}
