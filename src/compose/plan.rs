// src/compose/plan.rs

//! Composition plan (the OUTPUT section)
//!
//! The plan is an ordered sequence of module entries. A module may only be
//! solved after every group it includes or excludes has itself been solved,
//! so the declared order must be a topological order of the includes
//! relation. The plan is validated up front: a broken plan is rejected
//! before any resolver call is made.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Per-module settings of one plan entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSettings {
    /// Groups whose resolved output this module builds on.
    #[serde(default)]
    pub includes: Vec<String>,
    /// Groups subtracted from this module's resolved output.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Expand recommended packages while solving; defaults to the run-wide
    /// setting when absent.
    #[serde(default)]
    pub recommends: Option<bool>,
    /// Treat every include as important: missing packages are error-level
    /// diagnostics and fail the run.
    #[serde(default)]
    pub require_all: bool,
    /// Sibling groups this module may overlap with without a warning.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Fallback support status for packages without an explicit entry.
    #[serde(default, rename = "default-support")]
    pub default_support: Option<String>,
}

/// One entry of the ordered composition plan.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub name: String,
    pub settings: ModuleSettings,
}

/// The ordered composition plan.
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    pub entries: Vec<PlanEntry>,
}

impl OutputPlan {
    /// Validate the plan against the set of defined groups: every referenced
    /// group must exist, no module may appear twice, the includes relation
    /// must be acyclic, and every include/exclude must be listed before the
    /// module that uses it.
    pub fn validate<F>(&self, group_exists: F) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for entry in &self.entries {
            if !group_exists(&entry.name) {
                return Err(Error::UnknownGroup(entry.name.clone()));
            }
            if !seen.insert(&entry.name) {
                return Err(Error::InvalidPlan(format!(
                    "module '{}' listed twice",
                    entry.name
                )));
            }
            for referenced in entry
                .settings
                .includes
                .iter()
                .chain(&entry.settings.excludes)
            {
                if !group_exists(referenced) {
                    return Err(Error::UnknownGroup(referenced.clone()));
                }
            }
        }

        self.check_acyclic()?;

        // includes and excludes must already be solved when a module runs
        let mut solved: BTreeSet<&str> = BTreeSet::new();
        for entry in &self.entries {
            for referenced in entry
                .settings
                .includes
                .iter()
                .chain(&entry.settings.excludes)
            {
                if !solved.contains(referenced.as_str()) {
                    return Err(Error::InvalidPlan(format!(
                        "module '{}' needs '{}' but it is listed later (or not at all)",
                        entry.name, referenced
                    )));
                }
            }
            solved.insert(&entry.name);
        }
        Ok(())
    }

    /// Kahn's algorithm over the includes relation; leftovers form a cycle.
    fn check_acyclic(&self) -> Result<()> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for entry in &self.entries {
            in_degree.entry(&entry.name).or_insert(0);
            for include in &entry.settings.includes {
                *in_degree.entry(&entry.name).or_insert(0) += 1;
                dependents.entry(include).or_default().push(&entry.name);
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut visited = 0usize;
        while let Some(name) = queue.pop_front() {
            visited += 1;
            for dependent in dependents.get(name).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if visited != in_degree.len() {
            let mut cycle: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(n, _)| *n)
                .collect();
            cycle.sort_unstable();
            return Err(Error::InvalidPlan(format!(
                "includes form a cycle involving: {}",
                cycle.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, includes: &[&str]) -> PlanEntry {
        PlanEntry {
            name: name.to_string(),
            settings: ModuleSettings {
                includes: includes.iter().map(|i| i.to_string()).collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn accepts_topological_order() {
        let plan = OutputPlan {
            entries: vec![entry("base", &[]), entry("desktop", &["base"])],
        };
        assert!(plan.validate(|_| true).is_ok());
    }

    #[test]
    fn rejects_include_listed_later() {
        let plan = OutputPlan {
            entries: vec![entry("desktop", &["base"]), entry("base", &[])],
        };
        assert!(matches!(plan.validate(|_| true), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn rejects_cycle() {
        let plan = OutputPlan {
            entries: vec![entry("a", &["b"]), entry("b", &["a"])],
        };
        assert!(matches!(plan.validate(|_| true), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn rejects_unknown_group() {
        let plan = OutputPlan {
            entries: vec![entry("a", &[])],
        };
        assert!(matches!(
            plan.validate(|name| name != "a"),
            Err(Error::UnknownGroup(_))
        ));
    }

    #[test]
    fn rejects_duplicate_module() {
        let plan = OutputPlan {
            entries: vec![entry("a", &[]), entry("a", &[])],
        };
        assert!(matches!(plan.validate(|_| true), Err(Error::InvalidPlan(_))));
    }
}
