// src/solver/closure.rs

//! Built-in dependency-closure resolver
//!
//! Walks the `requires` closure of every hard request, routing capability
//! names through the universe's provides index. Deterministic: when several
//! packages provide a capability the lexicographically first one wins.
//! Locked packages are pinned: a hard request that needs one makes the job
//! unsatisfiable, a soft request that needs one is dropped.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::error::Result;
use crate::solver::{
    InstallClass, InstalledPackage, JobList, Outcome, Resolution, Resolver,
};
use crate::universe::{Solvable, Universe};

pub struct ClosureResolver<'a> {
    universe: &'a Universe,
}

impl<'a> ClosureResolver<'a> {
    pub fn new(universe: &'a Universe) -> Self {
        Self { universe }
    }

    /// Resolve a dependency string to a concrete package: by name first,
    /// then through the provides index.
    fn lookup(&self, arch: &str, dep: &str) -> Option<&Solvable> {
        if let Some(solvable) = self.universe.package(arch, dep) {
            return Some(solvable);
        }
        self.universe
            .whatprovides(arch, dep)
            .iter()
            .min()
            .and_then(|name| self.universe.package(arch, name))
    }

    /// Add `name` and its requires closure to `installed`.
    /// Returns an explanation string on the first unsatisfiable dependency.
    fn install_closure(
        &self,
        arch: &str,
        name: &str,
        locked: &BTreeSet<String>,
        installed: &mut BTreeSet<String>,
    ) -> std::result::Result<(), String> {
        let mut queue = VecDeque::new();
        queue.push_back((name.to_string(), None::<String>));
        let mut added = Vec::new();

        while let Some((dep, required_by)) = queue.pop_front() {
            let Some(solvable) = self.lookup(arch, &dep) else {
                if is_virtual_provide(&dep) {
                    // capability namespaces the index does not model
                    continue;
                }
                let explanation = match &required_by {
                    Some(by) => format!("nothing provides {dep} needed by {by}"),
                    None => format!("nothing provides {dep}"),
                };
                installed.retain(|p| !added.contains(p));
                return Err(explanation);
            };
            if locked.contains(&solvable.name) {
                let explanation = match &required_by {
                    Some(by) => format!(
                        "package {by} requires {dep} but {} is locked",
                        solvable.name
                    ),
                    None => format!("package {} is locked", solvable.name),
                };
                installed.retain(|p| !added.contains(p));
                return Err(explanation);
            }
            if !installed.insert(solvable.name.clone()) {
                continue;
            }
            added.push(solvable.name.clone());
            for req in &solvable.requires {
                let req = req.split_whitespace().next().unwrap_or(req);
                queue.push_back((req.to_string(), Some(solvable.name.clone())));
            }
        }
        Ok(())
    }

    /// Weak-relation offers of the installed set: existing, unlocked,
    /// not-yet-installed packages.
    fn collect_offers<F>(
        &self,
        arch: &str,
        installed: &BTreeSet<String>,
        locked: &BTreeSet<String>,
        relation: F,
    ) -> Vec<String>
    where
        F: Fn(&Solvable) -> &[String],
    {
        let mut offers = BTreeSet::new();
        for name in installed {
            let Some(solvable) = self.universe.package(arch, name) else {
                continue;
            };
            for dep in relation(solvable) {
                let dep = dep.split_whitespace().next().unwrap_or(dep);
                if let Some(offer) = self.lookup(arch, dep) {
                    if !installed.contains(&offer.name) && !locked.contains(&offer.name) {
                        offers.insert(offer.name.clone());
                    }
                }
            }
        }
        offers.into_iter().collect()
    }
}

impl Resolver for ClosureResolver<'_> {
    fn resolve(&self, arch: &str, jobs: &JobList) -> Result<Outcome> {
        let locked: BTreeSet<String> = jobs
            .requests
            .iter()
            .filter(|r| r.class == InstallClass::Locked)
            .map(|r| r.name.clone())
            .collect();

        let mut installed = BTreeSet::new();
        for request in &jobs.requests {
            if request.class == InstallClass::Locked {
                continue;
            }
            if let Err(explanation) =
                self.install_closure(arch, &request.name, &locked, &mut installed)
            {
                return Ok(Outcome::Unresolvable(explanation));
            }
        }

        for name in &jobs.soft {
            if let Err(explanation) = self.install_closure(arch, name, &locked, &mut installed) {
                debug!("{arch}: dropping soft request {name}: {explanation}");
            }
        }

        if jobs.with_recommends {
            // recommends of recommends are pulled in too, to a fixpoint
            let mut rejected: BTreeSet<String> = BTreeSet::new();
            loop {
                let offers: Vec<String> = self
                    .collect_offers(arch, &installed, &locked, |s| &s.recommends)
                    .into_iter()
                    .filter(|offer| !rejected.contains(offer))
                    .collect();
                if offers.is_empty() {
                    break;
                }
                for offer in offers {
                    if let Err(explanation) =
                        self.install_closure(arch, &offer, &locked, &mut installed)
                    {
                        debug!("{arch}: dropping recommended {offer}: {explanation}");
                        rejected.insert(offer);
                    }
                }
            }
        }

        let recommended = self.collect_offers(arch, &installed, &locked, |s| &s.recommends);
        let suggested = self.collect_offers(arch, &installed, &locked, |s| &s.suggests);

        let installed = installed
            .into_iter()
            .map(|name| {
                let source = self
                    .universe
                    .package(arch, &name)
                    .map(|s| s.source_package().to_string())
                    .unwrap_or_else(|| name.clone());
                InstalledPackage { name, source }
            })
            .collect();

        Ok(Outcome::Solved(Resolution {
            installed,
            recommended,
            suggested,
        }))
    }
}

/// Capability namespaces that are not plain package names: `perl(Cwd)`,
/// `pkgconfig(foo)`, shared libraries, file paths.
fn is_virtual_provide(name: &str) -> bool {
    name.contains('(')
        || (name.starts_with("lib") && name.contains(".so"))
        || name.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::Solvable;

    fn universe() -> Universe {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("bash").requires(&["glibc"]));
        universe.insert(
            "x86_64",
            Solvable::new("glibc").recommends(&["glibc-locale"]),
        );
        universe.insert("x86_64", Solvable::new("glibc-locale"));
        universe.insert(
            "x86_64",
            Solvable::new("vim").requires(&["vim-data"]).suggests(&["ctags"]),
        );
        universe.insert("x86_64", Solvable::new("vim-data"));
        universe.insert("x86_64", Solvable::new("ctags"));
        universe
    }

    #[test]
    fn resolves_requires_closure() {
        let universe = universe();
        let resolver = ClosureResolver::new(&universe);
        let mut jobs = JobList::new();
        jobs.install("bash");
        let Outcome::Solved(resolution) = resolver.resolve("x86_64", &jobs).unwrap() else {
            panic!("expected solved outcome");
        };
        let names: Vec<_> = resolution.installed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bash", "glibc"]);
        assert_eq!(resolution.recommended, ["glibc-locale"]);
    }

    #[test]
    fn missing_dependency_is_unresolvable() {
        let mut universe = universe();
        universe.insert("x86_64", Solvable::new("broken").requires(&["no-such-pkg"]));
        let resolver = ClosureResolver::new(&universe);
        let mut jobs = JobList::new();
        jobs.install("broken");
        let Outcome::Unresolvable(explanation) = resolver.resolve("x86_64", &jobs).unwrap() else {
            panic!("expected unresolvable outcome");
        };
        assert!(explanation.contains("no-such-pkg"));
        assert!(explanation.contains("broken"));
    }

    #[test]
    fn locked_dependency_fails_hard_request() {
        let universe = universe();
        let resolver = ClosureResolver::new(&universe);
        let mut jobs = JobList::new();
        jobs.install("bash");
        jobs.lock("glibc");
        let Outcome::Unresolvable(explanation) = resolver.resolve("x86_64", &jobs).unwrap() else {
            panic!("expected unresolvable outcome");
        };
        assert!(explanation.contains("locked"));
    }

    #[test]
    fn soft_requests_fail_silently() {
        let universe = universe();
        let resolver = ClosureResolver::new(&universe);
        let mut jobs = JobList::new();
        jobs.install("bash");
        jobs.soft_install("no-such-pkg");
        jobs.soft_install("ctags");
        let Outcome::Solved(resolution) = resolver.resolve("x86_64", &jobs).unwrap() else {
            panic!("expected solved outcome");
        };
        let names: Vec<_> = resolution.installed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bash", "ctags", "glibc"]);
    }

    #[test]
    fn virtual_requires_are_skipped() {
        let mut universe = Universe::new();
        universe.insert(
            "x86_64",
            Solvable::new("tool").requires(&["/bin/sh", "perl(Cwd)"]),
        );
        let resolver = ClosureResolver::new(&universe);
        let mut jobs = JobList::new();
        jobs.install("tool");
        let Outcome::Solved(resolution) = resolver.resolve("x86_64", &jobs).unwrap() else {
            panic!("expected solved outcome");
        };
        assert_eq!(resolution.installed.len(), 1);
    }

    #[test]
    fn capability_routed_through_provides() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("app").requires(&["webserver"]));
        universe.insert("x86_64", Solvable::new("nginx").provides(&["webserver"]));
        universe.insert("x86_64", Solvable::new("apache2").provides(&["webserver"]));
        let resolver = ClosureResolver::new(&universe);
        let mut jobs = JobList::new();
        jobs.install("app");
        let Outcome::Solved(resolution) = resolver.resolve("x86_64", &jobs).unwrap() else {
            panic!("expected solved outcome");
        };
        let names: Vec<_> = resolution.installed.iter().map(|p| p.name.as_str()).collect();
        // deterministic: lexicographically first provider
        assert_eq!(names, ["apache2", "app"]);
    }
}
