// src/group/mod.rs

//! Group entity and its per-architecture solve algorithm
//!
//! A [`Group`] is a named package-set specification for one product module:
//! an ordered wish-list per architecture plus modifier sets (locked, silent,
//! recommended/suggested expansion), and, after [`Group::solve`], the
//! resolved per-architecture package sets with provenance. Packages common
//! to every architecture are factored into the `"*"` bucket; packages
//! already owned by a base group are subtracted from the recorded output.

pub mod spec;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::COMMON;
use crate::error::{Error, Result};
use crate::solver::{JobList, Outcome, Resolver};
use crate::universe::Universe;

use spec::{GroupDef, PackageEntry};

/// Suffix of development-header packages paired with a source package.
pub const DEVEL_SUFFIX: &str = "-devel";

/// Provenance annotation for one resolved package. Free-form, audit-only:
/// never used for control flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reason(String);

impl Reason {
    pub fn none() -> Self {
        Self(String::new())
    }

    /// `origin:package`: a direct wish-list request.
    pub fn requested(origin: &str, package: &str) -> Self {
        Self(format!("{origin}:{package}"))
    }

    /// `origin:recommended:trigger`: pulled in by recommended expansion.
    pub fn recommended(origin: &str, trigger: &str) -> Self {
        Self(format!("{origin}:recommended:{trigger}"))
    }

    /// `origin:suggested:trigger`: pulled in by suggested expansion.
    pub fn suggested(origin: &str, trigger: &str) -> Self {
        Self(format!("{origin}:suggested:{trigger}"))
    }

    /// `origin:expansion`: added by the post-solve merge pass.
    pub fn expansion(origin: &str) -> Self {
        Self(format!("{origin}:expansion"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a solve run needs besides the group itself. Read-only.
pub struct SolveContext<'a> {
    pub universe: &'a Universe,
    pub resolver: &'a dyn Resolver,
    pub architectures: &'a [String],
    pub unwanted: &'a BTreeSet<String>,
}

/// Per-architecture output of one solve, merged after the parallel fan-out.
#[derive(Debug, Default)]
struct ArchSolve {
    solved: BTreeMap<String, Reason>,
    not_found: BTreeSet<String>,
    unresolvable: BTreeMap<String, String>,
    recommends: BTreeMap<String, Reason>,
    suggested: BTreeMap<String, Reason>,
    srcpkgs: BTreeMap<String, Reason>,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    /// `name` sanitized for use as an identifier; display/lookup only.
    pub safe_name: String,
    /// Wish-list per architecture; the `"*"` key applies to all. Entries
    /// keep the origin group name for provenance.
    packages: BTreeMap<String, Vec<(String, String)>>,
    pub locked: BTreeSet<String>,
    pub silent: BTreeSet<String>,
    pub expand_recommended: BTreeSet<String>,
    pub expand_suggested: BTreeSet<String>,

    /// Resolver output per architecture plus the `"*"` common bucket.
    pub solved_packages: BTreeMap<String, BTreeMap<String, Reason>>,
    pub solved: bool,
    /// Requested names missing from the universe, per architecture.
    pub not_found: BTreeMap<String, BTreeSet<String>>,
    /// Unsatisfiable top-level requests with the resolver's explanation.
    pub unresolvable: BTreeMap<String, BTreeMap<String, String>>,
    /// Recommendation offers, retained until filtered against siblings.
    pub recommends: BTreeMap<String, Reason>,
    /// Suggestion offers, used for leftover annotation.
    pub suggested: BTreeMap<String, Reason>,
    /// Source packages captured during solving, for devel collection.
    pub srcpkgs: BTreeMap<String, Reason>,
    /// Devel packages whose source package this group captured.
    pub develpkgs: BTreeMap<String, Reason>,
    /// Full installed set per architecture before base subtraction;
    /// input to the important-include cross-check.
    installed: BTreeMap<String, BTreeSet<String>>,

    /// Names of the groups this group builds on.
    pub base: Vec<String>,
    /// Names of the groups subtracted from this group's output.
    pub ignored: BTreeSet<String>,
    /// Sibling groups this group may overlap with silently.
    pub conflicts: BTreeSet<String>,
    pub default_support_status: Option<String>,
    pub comment: String,
}

impl Group {
    pub fn new(name: &str) -> Self {
        let safe_name = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        Self {
            name: name.to_string(),
            safe_name,
            packages: BTreeMap::new(),
            locked: BTreeSet::new(),
            silent: BTreeSet::new(),
            expand_recommended: BTreeSet::new(),
            expand_suggested: BTreeSet::new(),
            solved_packages: BTreeMap::new(),
            solved: false,
            not_found: BTreeMap::new(),
            unresolvable: BTreeMap::new(),
            recommends: BTreeMap::new(),
            suggested: BTreeMap::new(),
            srcpkgs: BTreeMap::new(),
            develpkgs: BTreeMap::new(),
            installed: BTreeMap::new(),
            base: Vec::new(),
            ignored: BTreeSet::new(),
            conflicts: BTreeSet::new(),
            default_support_status: None,
            comment: " ### AUTOMATICALLY GENERATED, DO NOT EDIT ### ".to_string(),
        }
    }

    /// Build a group from its declarative specification.
    pub fn from_def(def: &GroupDef) -> Self {
        let mut group = Self::new(&def.name);
        for entry in &def.packages {
            match entry {
                PackageEntry::Plain(name) => group.add_package(name, None),
                PackageEntry::Modified(mapping) => {
                    for (name, modifiers) in mapping {
                        for modifier in modifiers {
                            match modifier.as_str() {
                                "locked" => {
                                    group.locked.insert(name.clone());
                                    continue;
                                }
                                "silent" => {
                                    group.silent.insert(name.clone());
                                    group.add_package(name, None);
                                }
                                "recommended" => {
                                    group.expand_recommended.insert(name.clone());
                                    group.add_package(name, None);
                                }
                                "suggested" => {
                                    group.expand_suggested.insert(name.clone());
                                    group.expand_recommended.insert(name.clone());
                                    group.add_package(name, None);
                                }
                                arch => group.add_package(name, Some(arch)),
                            }
                        }
                    }
                }
            }
        }
        group
    }

    /// Append a package to the wish-list; `None` means every architecture.
    pub fn add_package(&mut self, name: &str, arch: Option<&str>) {
        let key = arch.unwrap_or(COMMON).to_string();
        self.packages
            .entry(key)
            .or_default()
            .push((name.to_string(), self.name.clone()));
    }

    pub fn append_comment(&mut self, text: &str) {
        self.comment.push_str(text);
    }

    fn verify_solved(&self) -> Result<()> {
        if !self.solved {
            return Err(Error::GroupNotSolved(self.name.clone()));
        }
        Ok(())
    }

    /// Wish-list requests relevant on `arch`: the common list followed by
    /// the architecture-specific one, in declared order.
    fn requests_for(&self, arch: &str) -> Vec<(String, String)> {
        let mut requests = Vec::new();
        for key in [COMMON, arch] {
            if let Some(list) = self.packages.get(key) {
                requests.extend(list.iter().cloned());
            }
        }
        requests
    }

    /// Resolve the wish-list against the universe, once per configured
    /// architecture. Populates `solved_packages`, `not_found`,
    /// `unresolvable`, `recommends` and `srcpkgs`; a second call is
    /// rejected as a programming error.
    pub fn solve(
        &mut self,
        ctx: &SolveContext<'_>,
        base: &[&Group],
        use_recommends: bool,
    ) -> Result<()> {
        if self.solved {
            return Err(Error::AlreadySolved(self.name.clone()));
        }
        for b in base {
            if !b.solved {
                return Err(Error::BaseNotSolved {
                    group: self.name.clone(),
                    base: b.name.clone(),
                });
            }
        }

        // pinned and hidden packages of the floor stay pinned and hidden
        for b in base {
            self.locked.extend(b.locked.iter().cloned());
            self.silent.extend(b.silent.iter().cloned());
        }
        self.base = base.iter().map(|b| b.name.clone()).collect();

        let start = std::time::Instant::now();
        let results: Result<Vec<(String, ArchSolve)>> = ctx
            .architectures
            .par_iter()
            .map(|arch| {
                self.solve_arch(ctx, base, arch, use_recommends)
                    .map(|out| (arch.clone(), out))
            })
            .collect();
        let results = results?;
        info!("{} - solving took {:?}", self.name, start.elapsed());

        let mut solved: BTreeMap<String, BTreeMap<String, Reason>> = BTreeMap::new();
        for (arch, out) in results {
            for name in out.not_found {
                self.not_found.entry(name).or_default().insert(arch.clone());
            }
            self.unresolvable.insert(arch.clone(), out.unresolvable);
            for (name, reason) in out.recommends {
                self.recommends.entry(name).or_insert(reason);
            }
            for (name, reason) in out.suggested {
                self.suggested.entry(name).or_insert(reason);
            }
            for (name, reason) in out.srcpkgs {
                self.srcpkgs.entry(name).or_insert(reason);
            }
            solved.insert(arch, out.solved);
        }

        // factor the common set into the "*" bucket
        let mut common: Option<BTreeSet<String>> = None;
        for arch in ctx.architectures {
            let names: BTreeSet<String> = solved
                .get(arch)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            common = Some(match common {
                None => names,
                Some(prev) => prev.intersection(&names).cloned().collect(),
            });
        }
        let common = common.unwrap_or_default();

        let mut star: BTreeMap<String, Reason> = BTreeMap::new();
        for arch in ctx.architectures {
            if let Some(map) = solved.get_mut(arch) {
                for name in &common {
                    if let Some(reason) = map.remove(name) {
                        star.entry(name.clone()).or_insert(reason);
                    }
                }
            }
        }
        solved.insert(COMMON.to_string(), star);

        // snapshot the full installed set before base subtraction; the
        // important-include check needs it
        for arch in ctx.architectures {
            let mut full: BTreeSet<String> = solved
                .get(arch)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            if let Some(star) = solved.get(COMMON) {
                full.extend(star.keys().cloned());
            }
            self.installed.insert(arch.clone(), full);
        }

        // packages already owned by a base group are not re-attributed;
        // the base's installed sets carry its own base chain, so ownership
        // is subtracted transitively
        for b in base {
            let mut owned = b.full_package_set();
            for set in b.installed.values() {
                owned.extend(set.iter().cloned());
            }
            for map in solved.values_mut() {
                map.retain(|name, _| !owned.contains(name));
            }
        }

        self.solved_packages = solved;
        self.solved = true;
        Ok(())
    }

    fn solve_arch(
        &self,
        ctx: &SolveContext<'_>,
        base: &[&Group],
        arch: &str,
        use_recommends: bool,
    ) -> Result<ArchSolve> {
        let mut out = ArchSolve::default();

        // base floor: everything the base groups installed on this arch,
        // including what they inherited from their own bases
        let mut floor: Vec<(String, String)> = Vec::new();
        for b in base {
            if let Some(set) = b.installed_on(arch) {
                floor.extend(set.iter().map(|n| (n.clone(), b.name.clone())));
            }
        }

        // lock list; names absent from the universe are skipped, absence
        // of a locked package is never an error
        let locks: BTreeSet<String> = self
            .locked
            .iter()
            .chain(ctx.unwanted.iter())
            .filter(|name| ctx.universe.contains(arch, name))
            .cloned()
            .collect();

        let mut pending: Vec<(String, Reason)> = Vec::new();
        let requests = self.requests_for(arch);
        for (name, origin) in &requests {
            self.solve_one(
                ctx,
                arch,
                &floor,
                &locks,
                use_recommends,
                name,
                origin,
                Reason::requested(origin, name),
                &mut out,
                &mut pending,
            )?;
        }

        // recommended-expansion entries behave like extra wish-list
        // requests; the seen set keeps mutually recommending packages from
        // re-enqueueing each other forever
        let mut expanded: BTreeSet<String> = requests.iter().map(|(n, _)| n.clone()).collect();
        while let Some((name, reason)) = pending.pop() {
            if !expanded.insert(name.clone()) {
                continue;
            }
            let mut more = Vec::new();
            self.solve_one(
                ctx,
                arch,
                &floor,
                &locks,
                use_recommends,
                &name,
                &self.name,
                reason,
                &mut out,
                &mut more,
            )?;
            pending.extend(more);
        }

        // suggested names ride along as soft requests; a suggestion that
        // cannot be resolved is dropped, never an error
        if !out.suggested.is_empty() {
            let mut jobs = JobList::new();
            jobs.expand_recommends(use_recommends);
            let names: Vec<String> = out.solved.keys().cloned().collect();
            for name in names {
                jobs.install(name);
            }
            for lock in &locks {
                jobs.lock(lock.clone());
            }
            for name in out.suggested.keys() {
                jobs.soft_install(name.clone());
            }
            if let Outcome::Solved(resolution) = ctx.resolver.resolve(arch, &jobs)? {
                for pkg in &resolution.installed {
                    out.srcpkgs
                        .entry(pkg.source.clone())
                        .or_insert_with(|| Reason::requested(&self.name, &pkg.name));
                    if self.silent.contains(&pkg.name) {
                        continue;
                    }
                    let reason = out
                        .suggested
                        .get(&pkg.name)
                        .cloned()
                        .unwrap_or_else(|| Reason::expansion(&self.name));
                    out.solved.entry(pkg.name.clone()).or_insert(reason);
                }
            }
        }

        Ok(out)
    }

    /// Solve one top-level request against the universe for one
    /// architecture, recording diagnostics instead of failing.
    #[allow(clippy::too_many_arguments)]
    fn solve_one(
        &self,
        ctx: &SolveContext<'_>,
        arch: &str,
        floor: &[(String, String)],
        locks: &BTreeSet<String>,
        use_recommends: bool,
        name: &str,
        origin: &str,
        reason: Reason,
        out: &mut ArchSolve,
        pending: &mut Vec<(String, Reason)>,
    ) -> Result<()> {
        let Some(solvable) = ctx.universe.package(arch, name) else {
            debug!("{}.{}: package {} not found", self.name, arch, name);
            out.not_found.insert(name.to_string());
            return Ok(());
        };

        if self.expand_recommended.contains(name) {
            // only recommends that exist as real packages are expanded
            for dep in &solvable.recommends {
                let dep = dep.split_whitespace().next().unwrap_or(dep);
                if ctx.universe.contains(arch, dep) {
                    pending.push((dep.to_string(), Reason::recommended(origin, name)));
                }
            }
        }

        let mut jobs = JobList::new();
        jobs.expand_recommends(use_recommends);
        jobs.install(name);
        for (pkg, _) in floor {
            jobs.install(pkg.clone());
        }
        for lock in locks {
            jobs.lock(lock.clone());
        }
        for pkg in &self.silent {
            if ctx.universe.contains(arch, pkg) {
                jobs.install_silent(pkg.clone());
            } else {
                warn!("{}.{}: silent package {} not found", self.name, arch, pkg);
            }
        }

        match ctx.resolver.resolve(arch, &jobs)? {
            Outcome::Unresolvable(explanation) => {
                debug!(
                    "unresolvable: {}:{}.{}: {}",
                    self.name, name, arch, explanation
                );
                out.unresolvable.insert(name.to_string(), explanation);
            }
            Outcome::Solved(resolution) => {
                for pkg in &resolution.installed {
                    out.srcpkgs
                        .entry(pkg.source.clone())
                        .or_insert_with(|| Reason::requested(origin, &pkg.name));
                    if self.silent.contains(&pkg.name) {
                        continue;
                    }
                    out.solved
                        .entry(pkg.name.clone())
                        .or_insert_with(|| reason.clone());
                }
                for offer in &resolution.recommended {
                    if locks.contains(offer) {
                        continue;
                    }
                    out.recommends
                        .entry(offer.clone())
                        .or_insert_with(|| Reason::requested(origin, name));
                }
                if self.expand_suggested.contains(name) {
                    for offer in &resolution.suggested {
                        out.suggested
                            .entry(offer.clone())
                            .or_insert_with(|| Reason::suggested(origin, name));
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove everything `other` resolved from this group's output, so a
    /// package is attributed to exactly one group. Also drops `not_found`
    /// entries `other` already reports.
    pub fn ignore(&mut self, other: &Group) -> Result<()> {
        self.verify_solved()?;
        other.verify_solved()?;

        let removal = other.full_package_set();
        for map in self.solved_packages.values_mut() {
            map.retain(|name, _| !removal.contains(name));
        }

        self.not_found.retain(|name, archs| {
            if let Some(theirs) = other.not_found.get(name) {
                archs.retain(|a| !theirs.contains(a));
            }
            !archs.is_empty()
        });

        self.ignored.insert(other.name.clone());
        Ok(())
    }

    /// Every resolved package of this group, across `"*"` and all
    /// architectures.
    pub fn full_package_set(&self) -> BTreeSet<String> {
        self.solved_packages
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect()
    }

    /// The full installed set on `arch` before base subtraction.
    pub fn installed_on(&self, arch: &str) -> Option<&BTreeSet<String>> {
        self.installed.get(arch)
    }

    /// Record devel packages whose source package this group captured.
    pub fn collect_devel_packages(
        &mut self,
        universe: &Universe,
        architectures: &[String],
    ) -> Result<()> {
        self.verify_solved()?;
        for arch in architectures {
            for solvable in universe.packages(arch) {
                if !solvable.name.ends_with(DEVEL_SUFFIX) {
                    continue;
                }
                if let Some(reason) = self.srcpkgs.get(solvable.source_package()) {
                    self.develpkgs
                        .entry(solvable.name.clone())
                        .or_insert_with(|| reason.clone());
                }
            }
        }
        Ok(())
    }

    /// Drop recommendation offers already attributed to any solved group.
    pub fn filter_already_selected(&mut self, selected: &[BTreeSet<String>]) {
        self.recommends
            .retain(|name, _| !selected.iter().any(|set| set.contains(name)));
    }

    /// All packages in this group's output, as one flat set.
    pub fn summary(&self) -> BTreeSet<String> {
        self.full_package_set()
    }

    /// Clear resolution state so the group can be solved again. Only the
    /// composer uses this, for the overlap group's second pass.
    pub(crate) fn reset_solved(&mut self) {
        self.solved = false;
        self.solved_packages.clear();
        self.not_found.clear();
        self.unresolvable.clear();
        self.recommends.clear();
        self.suggested.clear();
        self.srcpkgs.clear();
        self.develpkgs.clear();
        self.installed.clear();
        self.base.clear();
    }

    /// Overwrite the resolved output wholesale. Only the composer uses
    /// this, to hand the unsorted group its remainder.
    pub(crate) fn assign_solved(
        &mut self,
        solved: BTreeMap<String, BTreeMap<String, Reason>>,
    ) {
        self.solved_packages = solved;
        self.solved = true;
    }
}
