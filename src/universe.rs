// src/universe.rs

//! Per-architecture package universe
//!
//! A read-only index of the packages available on each configured
//! architecture, with their declared dependency relations. Loaded from a
//! JSON repository index; read-only for the duration of a composition run.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// One available binary package and its declared relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solvable {
    pub name: String,
    /// Source package this binary was built from; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplements: Vec<String>,
}

impl Solvable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            requires: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
            provides: Vec::new(),
            supplements: Vec::new(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn requires(mut self, deps: &[&str]) -> Self {
        self.requires = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn recommends(mut self, deps: &[&str]) -> Self {
        self.recommends = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn suggests(mut self, deps: &[&str]) -> Self {
        self.suggests = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn provides(mut self, caps: &[&str]) -> Self {
        self.provides = caps.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn supplements(mut self, caps: &[&str]) -> Self {
        self.supplements = caps.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Source package name, falling back to the binary name the way
    /// source-built metadata does.
    pub fn source_package(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// On-disk repository index format.
#[derive(Debug, Serialize, Deserialize)]
pub struct RepositoryIndex {
    /// Snapshot state token of the repository this index was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub architectures: HashMap<String, Vec<Solvable>>,
}

#[derive(Debug, Default)]
struct ArchIndex {
    packages: BTreeMap<String, Solvable>,
    /// capability name -> providing package names
    providers: HashMap<String, Vec<String>>,
}

/// Queryable package universe, one index per architecture.
#[derive(Debug, Default)]
pub struct Universe {
    state: Option<String>,
    arches: HashMap<String, ArchIndex>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a universe from a JSON repository index file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("reading repository index {}", path.display());
        let index: RepositoryIndex = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Ok(Self::from_index(index))
    }

    pub fn from_index(index: RepositoryIndex) -> Self {
        let mut universe = Self {
            state: index.state,
            arches: HashMap::new(),
        };
        for (arch, solvables) in index.architectures {
            for solvable in solvables {
                universe.insert(&arch, solvable);
            }
            // architectures may legitimately be empty
            universe.arches.entry(arch).or_default();
        }
        universe
    }

    /// Add one package to an architecture's index.
    pub fn insert(&mut self, arch: &str, solvable: Solvable) {
        let index = self.arches.entry(arch.to_string()).or_default();
        index
            .providers
            .entry(solvable.name.clone())
            .or_default()
            .push(solvable.name.clone());
        for cap in &solvable.provides {
            // strip any version relation: "cap = 1.0" provides "cap"
            let cap = cap.split_whitespace().next().unwrap_or(cap);
            index
                .providers
                .entry(cap.to_string())
                .or_default()
                .push(solvable.name.clone());
        }
        index.packages.insert(solvable.name.clone(), solvable);
    }

    /// Abort with [`Error::RepositoryStateMismatch`] if the index was built
    /// from a different repository snapshot than the caller pinned.
    pub fn verify_state(&self, expected: &str) -> Result<()> {
        let actual = self.state.as_deref().unwrap_or("");
        if actual != expected {
            return Err(Error::RepositoryStateMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Ensure every configured architecture has an index.
    pub fn verify_architectures(&self, architectures: &[String]) -> Result<()> {
        for arch in architectures {
            if !self.arches.contains_key(arch) {
                return Err(Error::MissingArchitecture(arch.clone()));
            }
        }
        Ok(())
    }

    pub fn contains(&self, arch: &str, name: &str) -> bool {
        self.arches
            .get(arch)
            .is_some_and(|index| index.packages.contains_key(name))
    }

    pub fn package(&self, arch: &str, name: &str) -> Option<&Solvable> {
        self.arches.get(arch)?.packages.get(name)
    }

    /// All packages of one architecture, in name order.
    pub fn packages(&self, arch: &str) -> impl Iterator<Item = &Solvable> {
        self.arches
            .get(arch)
            .into_iter()
            .flat_map(|index| index.packages.values())
    }

    /// Package names providing `capability` on `arch` (a package always
    /// provides its own name).
    pub fn whatprovides(&self, arch: &str, capability: &str) -> &[String] {
        self.arches
            .get(arch)
            .and_then(|index| index.providers.get(capability))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provides_are_indexed_without_version_relation() {
        let mut universe = Universe::new();
        universe.insert(
            "x86_64",
            Solvable::new("libfoo1").provides(&["libfoo.so.1 = 1.2.3"]),
        );
        assert_eq!(universe.whatprovides("x86_64", "libfoo.so.1"), ["libfoo1"]);
        assert_eq!(universe.whatprovides("x86_64", "libfoo1"), ["libfoo1"]);
    }

    #[test]
    fn state_mismatch_is_fatal() {
        let universe = Universe::from_index(RepositoryIndex {
            state: Some("abc".into()),
            architectures: HashMap::new(),
        });
        assert!(universe.verify_state("abc").is_ok());
        assert!(matches!(
            universe.verify_state("def"),
            Err(Error::RepositoryStateMismatch { .. })
        ));
    }

    #[test]
    fn source_package_falls_back_to_name() {
        let solvable = Solvable::new("bash");
        assert_eq!(solvable.source_package(), "bash");
        let solvable = Solvable::new("bash-doc").source("bash");
        assert_eq!(solvable.source_package(), "bash");
    }
}
