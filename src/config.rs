// src/config.rs

//! Composition configuration
//!
//! All run-wide knobs live here and are passed into the [`Composer`]
//! explicitly at construction; nothing is read from ambient global state.
//!
//! [`Composer`]: crate::compose::Composer

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Architectures a default openSUSE-style target is built for.
pub const DEFAULT_ARCHITECTURES: &[&str] = &["x86_64", "ppc64le", "s390x", "aarch64"];

/// The synthetic architecture marker for packages common to all
/// configured architectures.
pub const COMMON: &str = "*";

/// Run-wide composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Full architecture set the target supports.
    pub architectures: Vec<String>,
    /// Render missing/unresolvable packages as comments instead of
    /// error markers in the group documents.
    pub ignore_broken: bool,
    /// Default for modules whose plan entry does not set `recommends`.
    pub use_recommends: bool,
    /// Supported locales, fed into the supplement check.
    pub locales: BTreeSet<String>,
    /// Globally excluded package names, merged from every group file's
    /// UNWANTED section.
    pub unwanted: BTreeSet<String>,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            architectures: DEFAULT_ARCHITECTURES.iter().map(|a| a.to_string()).collect(),
            ignore_broken: false,
            use_recommends: true,
            locales: BTreeSet::new(),
            unwanted: BTreeSet::new(),
        }
    }
}

impl CompositionConfig {
    /// Restrict the configured architecture set to `requested`, keeping the
    /// configured order. Unknown names are dropped.
    pub fn filter_architectures<I, S>(&mut self, requested: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: BTreeSet<String> =
            requested.into_iter().map(|a| a.as_ref().to_string()).collect();
        self.architectures.retain(|a| requested.contains(a));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keeps_configured_order() {
        let mut config = CompositionConfig::default();
        config.filter_architectures(["aarch64", "x86_64", "riscv64"]);
        assert_eq!(config.architectures, vec!["x86_64", "aarch64"]);
    }

    #[test]
    fn default_has_all_architectures() {
        let config = CompositionConfig::default();
        assert_eq!(config.architectures.len(), DEFAULT_ARCHITECTURES.len());
    }
}
