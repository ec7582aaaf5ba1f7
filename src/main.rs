// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Solve(args)) => {
            if commands::solve(&args)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Stubs(args)) => commands::stubs(&args),
        None => {
            println!("pkglistgen v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'pkglistgen --help' for usage information");
            Ok(())
        }
    }
}
