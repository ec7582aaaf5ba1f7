// src/error.rs

//! Error types for the package list generation engine
//!
//! Per-package problems (a name missing from the universe, an unsatisfiable
//! request) are *not* errors: they are recorded on the group as diagnostics
//! and resolution continues. Only structural problems (a broken composition
//! plan, a base group solved out of order, a stale repository snapshot)
//! abort the run.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A group was solved before one of the groups it builds on.
    /// This is a composition-plan ordering error, raised before any
    /// resolver call is made for the offending group.
    #[error("group '{group}' lists '{base}' as base but '{base}' is not solved yet")]
    BaseNotSolved { group: String, base: String },

    /// A composition operation ran against a group that has not been solved.
    #[error("group '{0}' is not solved")]
    GroupNotSolved(String),

    /// `solve()` was invoked twice on the same group.
    #[error("group '{0}' is already solved")]
    AlreadySolved(String),

    /// The composition plan references a group that was never defined.
    #[error("unknown group '{0}' referenced by the composition plan")]
    UnknownGroup(String),

    /// No OUTPUT plan was found in any group file.
    #[error("no OUTPUT composition plan defined")]
    OutputSpecMissing,

    /// More than one group file carried an OUTPUT plan.
    #[error("OUTPUT composition plan defined multiple times")]
    DuplicateOutputSpec,

    /// The includes/excludes relations of the OUTPUT plan do not form a DAG,
    /// or a module is listed before one of its includes.
    #[error("composition plan is not solvable in order: {0}")]
    InvalidPlan(String),

    /// The repository index does not match the state the caller pinned.
    /// The whole composition run must be retried against a fresh snapshot.
    #[error("repository state mismatch: expected '{expected}', index has '{actual}'")]
    RepositoryStateMismatch { expected: String, actual: String },

    /// The repository index lacks data for a configured architecture.
    #[error("repository index has no packages for architecture '{0}'")]
    MissingArchitecture(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to render group document: {0}")]
    Report(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
