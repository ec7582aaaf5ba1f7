// src/solver/mod.rs

//! Resolver interface
//!
//! The engine never solves dependency constraints itself: it builds a job
//! list and hands it to a [`Resolver`] once per (group, architecture) pair.
//! A resolver either returns the concrete set of installed packages with
//! provenance hooks, or a human-readable explanation of why the job is
//! unsatisfiable. The built-in [`ClosureResolver`] walks the requires
//! closure; a SAT-backed implementation can be slotted in behind the same
//! trait.

mod closure;

pub use closure::ClosureResolver;

use crate::error::Result;

/// How a requested package takes part in the job, decided once at
/// job-construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallClass {
    /// Install and emit in the final package list.
    Visible,
    /// Install to satisfy the wish-list but never emit.
    Silent,
    /// Pin to the current selection; never install, upgrade or remove.
    Locked,
}

/// One entry of a job list.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub name: String,
    pub class: InstallClass,
}

impl JobRequest {
    pub fn new(name: impl Into<String>, class: InstallClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

/// A resolver job: hard requests plus optional install-if-resolvable names.
#[derive(Debug, Clone, Default)]
pub struct JobList {
    pub requests: Vec<JobRequest>,
    /// Soft requests: resolved individually, failures are silently dropped.
    pub soft: Vec<String>,
    /// Also install what the installed set recommends.
    pub with_recommends: bool,
}

impl JobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand_recommends(&mut self, enabled: bool) -> &mut Self {
        self.with_recommends = enabled;
        self
    }

    pub fn install(&mut self, name: impl Into<String>) -> &mut Self {
        self.requests.push(JobRequest::new(name, InstallClass::Visible));
        self
    }

    pub fn install_silent(&mut self, name: impl Into<String>) -> &mut Self {
        self.requests.push(JobRequest::new(name, InstallClass::Silent));
        self
    }

    pub fn lock(&mut self, name: impl Into<String>) -> &mut Self {
        self.requests.push(JobRequest::new(name, InstallClass::Locked));
        self
    }

    pub fn soft_install(&mut self, name: impl Into<String>) -> &mut Self {
        self.soft.push(name.into());
        self
    }
}

/// One concretely installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    /// Source package the binary was built from.
    pub source: String,
}

/// Successful resolver output for one job.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Every package the job installs, in deterministic order.
    pub installed: Vec<InstalledPackage>,
    /// Existing packages the installed set recommends but does not require.
    pub recommended: Vec<String>,
    /// Existing packages the installed set suggests.
    pub suggested: Vec<String>,
}

/// Outcome of a resolver call. Unsatisfiability is data, not an error:
/// the group records the explanation and carries on.
#[derive(Debug, Clone)]
pub enum Outcome {
    Solved(Resolution),
    Unresolvable(String),
}

/// The external solving capability (spec boundary).
///
/// Stateless per call; implementations only read the universe. `Sync` so
/// per-architecture solves can fan out in parallel.
pub trait Resolver: Sync {
    fn resolve(&self, arch: &str, jobs: &JobList) -> Result<Outcome>;
}
