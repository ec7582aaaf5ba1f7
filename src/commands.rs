// src/commands.rs
//! Command handlers for the pkglistgen CLI

use std::path::Path;

use anyhow::Result;
use pkglistgen::compose::Composer;
use pkglistgen::config::CompositionConfig;
use pkglistgen::report;
use pkglistgen::solver::ClosureResolver;
use pkglistgen::universe::Universe;
use tracing::{error, info, warn};

use crate::cli::{SolveArgs, StubsArgs};

/// Run a full composition. Returns `true` when error-level diagnostics
/// were found and the process should exit non-zero.
pub fn solve(args: &SolveArgs) -> Result<bool> {
    let universe = Universe::load(Path::new(&args.repository))?;
    if let Some(state) = &args.state {
        universe.verify_state(state)?;
    }

    let mut config = CompositionConfig {
        ignore_broken: args.ignore_broken,
        use_recommends: !args.no_recommends,
        ..Default::default()
    };
    if !args.architectures.is_empty() {
        config.filter_architectures(&args.architectures);
    }
    config.locales.extend(args.locales.iter().cloned());

    let resolver = ClosureResolver::new(&universe);
    let mut composer = Composer::new(config, &universe, &resolver);

    let input_dir = Path::new(&args.input_dir);
    composer.load_dir(input_dir)?;
    composer.compose()?;

    let output_dir = Path::new(&args.output_dir);
    std::fs::create_dir_all(output_dir)?;

    let summary = report::write_all_groups(&composer, output_dir)?;
    report::write_summary(&summary, output_dir)?;
    report::write_unsorted(&composer, output_dir)?;

    // compare the review documents against any checked-in reference copies
    let summary_text = serde_yaml::to_string(&summary)?;
    if let Some(diag) = report::check_reference(input_dir, "summary.yml", &summary_text)? {
        composer.diagnostics.push(diag);
    }
    let unsorted_text = report::render_unsorted(&composer);
    if let Some(diag) = report::check_reference(input_dir, "unsorted.yml", &unsorted_text)? {
        composer.diagnostics.push(diag);
    }

    for diagnostic in &composer.diagnostics {
        if diagnostic.is_error() {
            error!("{diagnostic}");
        } else {
            warn!("{diagnostic}");
        }
    }
    info!(
        "composed {} modules, {} packages left unsorted",
        composer.modules().len(),
        composer.unsorted().packages.len()
    );
    Ok(composer.has_errors())
}

/// Write stub .group documents for groups without one.
pub fn stubs(args: &StubsArgs) -> Result<()> {
    let universe = Universe::new();
    let resolver = ClosureResolver::new(&universe);
    let mut composer = Composer::new(CompositionConfig::default(), &universe, &resolver);
    composer.load_dir(Path::new(&args.input_dir))?;

    let output_dir = Path::new(&args.output_dir);
    std::fs::create_dir_all(output_dir)?;
    let written = report::write_group_stubs(&composer, output_dir)?;
    info!("wrote {written} stub documents");
    Ok(())
}
