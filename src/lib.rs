// src/lib.rs

//! Package list generation engine
//!
//! Turns declarative group definitions into resolved, per-architecture
//! product package lists.
//!
//! # Architecture
//!
//! - Groups: named wish-lists with per-package modifiers, solved once per
//!   architecture; the common result is factored into a `"*"` bucket
//! - Composition plan: an ordered module list with include/exclude/conflict
//!   relations between groups
//! - Resolver boundary: dependency solving sits behind the [`Resolver`]
//!   trait; the built-in [`ClosureResolver`] walks the requires closure
//! - Accounting: every package of the universe ends up either attributed to
//!   exactly one group or reported as unsorted
//!
//! [`Resolver`]: solver::Resolver
//! [`ClosureResolver`]: solver::ClosureResolver

pub mod compose;
pub mod config;
mod error;
pub mod group;
pub mod report;
pub mod solver;
pub mod support;
pub mod universe;

pub use compose::{Composer, Diagnostic, UnsortedReport};
pub use compose::plan::{ModuleSettings, OutputPlan, PlanEntry};
pub use config::{CompositionConfig, COMMON, DEFAULT_ARCHITECTURES};
pub use error::{Error, Result};
pub use group::{Group, Reason, SolveContext};
pub use solver::{ClosureResolver, JobList, Outcome, Resolution, Resolver};
pub use support::SupportStatus;
pub use universe::{RepositoryIndex, Solvable, Universe};
