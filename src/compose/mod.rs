// src/compose/mod.rs

//! Composition orchestration
//!
//! The [`Composer`] owns the group registry and drives a full run: load the
//! group specifications, solve every module of the OUTPUT plan in declared
//! order, apply the inter-group composition rules (includes as a base
//! floor, excludes, conflicts), detect overlaps between siblings, and
//! account for every package no group claimed.
//!
//! Per-package problems accumulate as [`Diagnostic`] values; only
//! structural errors abort the run.

pub mod plan;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use regex::Regex;
use tracing::{debug, error, warn};

use crate::config::{COMMON, CompositionConfig};
use crate::error::{Error, Result};
use crate::group::spec::GroupFile;
use crate::group::{Group, Reason, SolveContext};
use crate::solver::Resolver;
use crate::support::SupportStatus;
use crate::universe::Universe;

use plan::{ModuleSettings, OutputPlan, PlanEntry};

/// Name of the group that centralizes sibling overlaps, when defined.
pub const OVERLAP_GROUP: &str = "overlap";
/// Name of the group that receives the raw leftover set, when defined.
pub const UNSORTED_GROUP: &str = "unsorted";

/// Accumulated per-run findings. Warnings are coverage signals; errors are
/// correctness signals that fail the run at exit without aborting it.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    /// A package of an important include is missing from the module's
    /// installed set on one architecture.
    MissingImportantPackage {
        group: String,
        included: String,
        package: String,
        arch: String,
    },
    /// Two sibling groups resolved to a shared package; folded into the
    /// overlap group automatically.
    Overlap {
        group_a: String,
        group_b: String,
        packages: Vec<String>,
    },
    /// A package supplements a hardware capability but no group claims it.
    UnclaimedSupplement { package: String },
    /// A package provides a supported locale but no group claims it.
    UnclaimedLocale { package: String },
    /// A generated document differs from its reference copy.
    ReferenceMismatch { document: String, diff: String },
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Diagnostic::MissingImportantPackage { .. } | Diagnostic::ReferenceMismatch { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingImportantPackage {
                group,
                included,
                package,
                arch,
            } => write!(
                f,
                "{group}.{arch}: package {package} of include {included} is missing"
            ),
            Diagnostic::Overlap {
                group_a,
                group_b,
                packages,
            } => write!(
                f,
                "overlap between {group_a} and {group_b}: {}",
                packages.join(", ")
            ),
            Diagnostic::UnclaimedSupplement { package } => {
                write!(f, "package {package} has supplements but is not grouped")
            }
            Diagnostic::UnclaimedLocale { package } => write!(
                f,
                "package {package} provides supported locale but is not grouped"
            ),
            Diagnostic::ReferenceMismatch { document, diff } => {
                write!(f, "{document} differs from reference:\n{diff}")
            }
        }
    }
}

/// One leftover package and where it was found.
#[derive(Debug, Clone)]
pub struct UnsortedEntry {
    pub architectures: BTreeSet<String>,
    pub reason: Option<String>,
}

/// The leftover accounting result: every package no group claimed.
#[derive(Debug, Clone, Default)]
pub struct UnsortedReport {
    pub packages: BTreeMap<String, UnsortedEntry>,
}

pub struct Composer<'a> {
    pub config: CompositionConfig,
    universe: &'a Universe,
    resolver: &'a dyn Resolver,
    groups: BTreeMap<String, Group>,
    plan: Option<OutputPlan>,
    pub support: SupportStatus,
    unneeded: Vec<Regex>,
    modules: Vec<String>,
    unsorted: UnsortedReport,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Composer<'a> {
    pub fn new(
        config: CompositionConfig,
        universe: &'a Universe,
        resolver: &'a dyn Resolver,
    ) -> Self {
        Self {
            config,
            universe,
            resolver,
            groups: BTreeMap::new(),
            plan: None,
            support: SupportStatus::new(),
            unneeded: Vec::new(),
            modules: Vec::new(),
            unsorted: UnsortedReport::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.insert(group.name.clone(), group);
    }

    pub fn set_plan(&mut self, plan: OutputPlan) -> Result<()> {
        if self.plan.is_some() {
            return Err(Error::DuplicateOutputSpec);
        }
        self.plan = Some(plan);
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Module names in plan order; filled by [`Composer::compose`].
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn unsorted(&self) -> &UnsortedReport {
        &self.unsorted
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Load every `group*.yml` in `input_dir`, plus the support-status
    /// table and the unneeded-package patterns.
    pub fn load_dir(&mut self, input_dir: &Path) -> Result<()> {
        self.support = SupportStatus::load(input_dir)?;
        self.unneeded = load_unneeded(input_dir)?;

        let pattern = input_dir.join("group*.yml");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| Error::Config("input directory is not valid UTF-8".into()))?;
        let mut paths: Vec<_> = glob::glob(pattern)
            .map_err(|e| Error::Config(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();
        paths.sort();

        for path in paths {
            debug!("reading {}", path.display());
            let file = GroupFile::parse(&std::fs::read_to_string(&path)?)?;
            for def in &file.groups {
                self.add_group(Group::from_def(def));
            }
            if let Some(plan) = file.output {
                self.set_plan(plan)?;
            }
            self.config.unwanted.extend(file.unwanted);
        }
        Ok(())
    }

    /// Solve one module in composition context: include floor, solve,
    /// excludes, and the important-include cross-check.
    pub fn solve_module(&mut self, entry: &PlanEntry) -> Result<()> {
        let use_recommends = entry
            .settings
            .recommends
            .unwrap_or(self.config.use_recommends);

        let mut group = self
            .groups
            .remove(&entry.name)
            .ok_or_else(|| Error::UnknownGroup(entry.name.clone()))?;

        let mut base: Vec<&Group> = Vec::new();
        for include in &entry.settings.includes {
            base.push(
                self.groups
                    .get(include)
                    .ok_or_else(|| Error::UnknownGroup(include.clone()))?,
            );
        }

        let ctx = SolveContext {
            universe: self.universe,
            resolver: self.resolver,
            architectures: &self.config.architectures,
            unwanted: &self.config.unwanted,
        };
        let result = group.solve(&ctx, &base, use_recommends);

        group.conflicts = entry.settings.conflicts.iter().cloned().collect();
        group.default_support_status = Some(
            entry
                .settings
                .default_support
                .clone()
                .unwrap_or_else(|| "unsupported".to_string()),
        );
        self.groups.insert(entry.name.clone(), group);
        result?;

        for excluded in &entry.settings.excludes {
            self.exclude(&entry.name, excluded)?;
        }

        if entry.settings.require_all {
            self.check_includes(&entry.name, &entry.settings.includes)?;
        }
        Ok(())
    }

    /// Subtract `excluded` (and, transitively, everything it ignores) from
    /// `name`'s resolved output.
    fn exclude(&mut self, name: &str, excluded: &str) -> Result<()> {
        let mut queue = vec![excluded.to_string()];
        let mut seen: BTreeSet<String> = BTreeSet::new();
        while let Some(next) = queue.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            let other = self
                .groups
                .get(&next)
                .ok_or_else(|| Error::UnknownGroup(next.clone()))?;
            queue.extend(other.ignored.iter().cloned());
        }

        let mut target = self
            .groups
            .remove(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?;
        let mut result = Ok(());
        for other_name in &seen {
            match self.groups.get(other_name) {
                Some(other) => {
                    if let Err(e) = target.ignore(other) {
                        result = Err(e);
                        break;
                    }
                }
                None => {
                    result = Err(Error::UnknownGroup(other_name.clone()));
                    break;
                }
            }
        }
        self.groups.insert(name.to_string(), target);
        result
    }

    /// Every package of an important include must appear in the module's
    /// installed set on every architecture; gaps are error-level
    /// diagnostics, not aborts.
    fn check_includes(&mut self, name: &str, includes: &[String]) -> Result<()> {
        let group = self
            .groups
            .get(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?;

        let mut found = Vec::new();
        for included in includes {
            let include = self
                .groups
                .get(included)
                .ok_or_else(|| Error::UnknownGroup(included.clone()))?;
            for arch in &self.config.architectures {
                let Some(installed) = group.installed_on(arch) else {
                    continue;
                };
                for key in [COMMON, arch.as_str()] {
                    let Some(map) = include.solved_packages.get(key) else {
                        continue;
                    };
                    for package in map.keys() {
                        if !installed.contains(package) {
                            error!(
                                "{}.{}: package {} of include {} is missing",
                                name, arch, package, included
                            );
                            found.push(Diagnostic::MissingImportantPackage {
                                group: name.to_string(),
                                included: included.clone(),
                                package: package.clone(),
                                arch: arch.clone(),
                            });
                        }
                    }
                }
            }
        }
        self.diagnostics.extend(found);
        Ok(())
    }

    /// Detect overlaps between `name` and every later-sorting sibling not
    /// covered by a conflicts declaration, folding shared packages into the
    /// overlap group's wish-list.
    fn check_dups(&mut self, name: &str, modules: &[String], overlap_name: &str) -> Result<()> {
        let this = self
            .groups
            .get(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?;
        let this_set = this.full_package_set();

        let mut comment = String::new();
        let mut folded: Vec<String> = Vec::new();
        let mut found = Vec::new();

        for other_name in modules {
            // only once per unordered pair, and never against ourselves
            if other_name.as_str() <= name {
                continue;
            }
            let other = self
                .groups
                .get(other_name)
                .ok_or_else(|| Error::UnknownGroup(other_name.clone()))?;
            if this.conflicts.contains(other_name) || other.conflicts.contains(name) {
                continue;
            }
            let shared: Vec<String> = this_set
                .intersection(&other.full_package_set())
                .cloned()
                .collect();
            if shared.is_empty() {
                continue;
            }

            warn!("overlap between {} and {}", name, other_name);
            comment.push_str(&format!("\n overlapping between {name} and {other_name}\n"));
            for package in &shared {
                for (arch, map) in &other.solved_packages {
                    if let Some(reason) = map.get(package) {
                        comment.push_str(&format!("  # {other_name}.{arch}: {reason}\n"));
                    }
                }
                for (arch, map) in &this.solved_packages {
                    if let Some(reason) = map.get(package) {
                        comment.push_str(&format!("  # {name}.{arch}: {reason}\n"));
                    }
                }
                comment.push_str(&format!("  - {package}\n"));
            }
            folded.extend(shared.iter().cloned());
            found.push(Diagnostic::Overlap {
                group_a: name.to_string(),
                group_b: other_name.clone(),
                packages: shared,
            });
        }

        if !found.is_empty() {
            let overlap = self
                .groups
                .get_mut(overlap_name)
                .ok_or_else(|| Error::UnknownGroup(overlap_name.to_string()))?;
            overlap.append_comment(&comment);
            for package in folded {
                overlap.add_package(&package, None);
            }
            self.diagnostics.extend(found);
        }
        Ok(())
    }

    /// Re-solve the overlap group with its folded wish-list and withdraw
    /// the overlapped packages from every other module.
    fn resolve_overlap(&mut self, modules: &[String]) -> Result<()> {
        let overlap = self
            .groups
            .get_mut(OVERLAP_GROUP)
            .ok_or_else(|| Error::UnknownGroup(OVERLAP_GROUP.to_string()))?;
        let ignores: Vec<String> = overlap.ignored.iter().cloned().collect();
        overlap.reset_solved();

        let entry = PlanEntry {
            name: OVERLAP_GROUP.to_string(),
            settings: ModuleSettings {
                excludes: ignores.clone(),
                recommends: Some(false),
                ..Default::default()
            },
        };
        self.solve_module(&entry)?;

        let overlapped = self.groups[OVERLAP_GROUP].full_package_set();
        let excluded: BTreeSet<String> = ignores.into_iter().collect();
        for name in modules {
            if name == OVERLAP_GROUP || excluded.contains(name) {
                continue;
            }
            if let Some(group) = self.groups.get_mut(name) {
                for map in group.solved_packages.values_mut() {
                    map.retain(|package, _| !overlapped.contains(package));
                }
            }
        }
        Ok(())
    }

    /// Compute the per-architecture remainder the groups did not claim.
    fn collect_unsorted(&mut self, modules: &[String]) -> Result<()> {
        let mut leftovers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let fill_unsorted = self.groups.contains_key(UNSORTED_GROUP);
        let mut unsorted_solved: BTreeMap<String, BTreeMap<String, Reason>> = BTreeMap::new();

        for arch in &self.config.architectures {
            let mut filtered: BTreeSet<String> = self
                .universe
                .packages(arch)
                .map(|s| s.name.clone())
                .filter(|name| !self.unneeded.iter().any(|re| re.is_match(name)))
                .filter(|name| !self.config.unwanted.contains(name))
                .collect();
            let mut raw: BTreeSet<String> =
                self.universe.packages(arch).map(|s| s.name.clone()).collect();

            for name in modules {
                if name == UNSORTED_GROUP {
                    continue;
                }
                let group = self
                    .groups
                    .get(name)
                    .ok_or_else(|| Error::UnknownGroup(name.clone()))?;
                for key in [COMMON, arch.as_str()] {
                    if let Some(map) = group.solved_packages.get(key) {
                        for package in map.keys() {
                            filtered.remove(package);
                            raw.remove(package);
                        }
                    }
                }
            }

            for package in filtered {
                leftovers.entry(package).or_default().insert(arch.clone());
            }
            if fill_unsorted {
                unsorted_solved.insert(
                    arch.clone(),
                    raw.into_iter().map(|p| (p, Reason::none())).collect(),
                );
            }
        }

        if fill_unsorted {
            // promote leftovers present on every architecture to "*"
            let mut common: Option<BTreeSet<String>> = None;
            for arch in &self.config.architectures {
                let names: BTreeSet<String> = unsorted_solved
                    .get(arch)
                    .map(|m| m.keys().cloned().collect())
                    .unwrap_or_default();
                common = Some(match common {
                    None => names,
                    Some(prev) => prev.intersection(&names).cloned().collect(),
                });
            }
            let mut star = BTreeMap::new();
            for package in common.unwrap_or_default() {
                for map in unsorted_solved.values_mut() {
                    map.remove(&package);
                }
                star.insert(package, Reason::none());
            }
            unsorted_solved.insert(COMMON.to_string(), star);
            if let Some(unsorted) = self.groups.get_mut(UNSORTED_GROUP) {
                unsorted.assign_solved(unsorted_solved);
            }
        }

        let mut report = UnsortedReport::default();
        for (package, architectures) in leftovers {
            let reason = self.find_reason(&package, modules);
            report
                .packages
                .insert(package, UnsortedEntry { architectures, reason });
        }
        self.unsorted = report;
        Ok(())
    }

    /// Best-effort hint relating a leftover package to a group, in fixed
    /// priority order: recommended-by, suggested-by, devel-of.
    fn find_reason(&self, package: &str, modules: &[String]) -> Option<String> {
        for name in modules {
            if let Some(reason) = self.groups.get(name)?.recommends.get(package) {
                return Some(format!("recommended by {reason}"));
            }
        }
        for name in modules {
            if let Some(reason) = self.groups.get(name)?.suggested.get(package) {
                return Some(format!("suggested by {reason}"));
            }
        }
        for name in modules {
            if let Some(reason) = self.groups.get(name)?.develpkgs.get(package) {
                return Some(format!("devel package of {reason}"));
            }
        }
        None
    }

    /// Warn about packages whose supplements target hardware or locale
    /// capabilities but which no solved group claims.
    fn check_supplements(&mut self) {
        let mut tocheck: BTreeSet<String> = BTreeSet::new();
        let mut tocheck_locales: BTreeSet<String> = BTreeSet::new();

        for arch in &self.config.architectures {
            for solvable in self.universe.packages(arch) {
                for dep in &solvable.supplements {
                    for token in dep.split_whitespace() {
                        if token.starts_with("namespace:modalias")
                            || token.starts_with("namespace:filesystem")
                        {
                            tocheck.insert(solvable.name.clone());
                        }
                    }
                }
            }
            for locale in &self.config.locales {
                for name in self
                    .universe
                    .whatprovides(arch, &format!("locale({locale})"))
                {
                    tocheck_locales.insert(name.clone());
                }
            }
        }

        let mut grouped: BTreeSet<String> = BTreeSet::new();
        for group in self.groups.values().filter(|g| g.solved) {
            grouped.extend(group.full_package_set());
        }

        for package in tocheck.difference(&grouped) {
            warn!("package {} has supplements but is not grouped", package);
            self.diagnostics.push(Diagnostic::UnclaimedSupplement {
                package: package.clone(),
            });
        }
        for package in tocheck_locales.difference(&grouped) {
            warn!(
                "package {} provides supported locale but is not grouped",
                package
            );
            self.diagnostics.push(Diagnostic::UnclaimedLocale {
                package: package.clone(),
            });
        }
    }

    /// Run the full composition: validate the plan, solve every module in
    /// declared order, detect and centralize overlaps, collect devel
    /// packages, enforce attribution exclusivity, and account for
    /// leftovers.
    pub fn compose(&mut self) -> Result<()> {
        let plan = self.plan.clone().ok_or(Error::OutputSpecMissing)?;
        plan.validate(|name| self.groups.contains_key(name))?;
        self.universe
            .verify_architectures(&self.config.architectures)?;

        let mut modules = Vec::new();
        for entry in &plan.entries {
            self.solve_module(entry)?;
            modules.push(entry.name.clone());
        }

        let have_overlap = self.groups.contains_key(OVERLAP_GROUP);
        if have_overlap {
            let names = modules.clone();
            for name in &names {
                self.check_dups(name, &names, OVERLAP_GROUP)?;
            }
        }

        for name in &modules {
            if let Some(group) = self.groups.get_mut(name) {
                group.collect_devel_packages(self.universe, &self.config.architectures)?;
            }
        }

        let selected: Vec<BTreeSet<String>> = modules
            .iter()
            .filter_map(|name| self.groups.get(name))
            .map(Group::full_package_set)
            .collect();
        for name in &modules {
            if let Some(group) = self.groups.get_mut(name) {
                group.filter_already_selected(&selected);
            }
        }

        if have_overlap {
            self.resolve_overlap(&modules)?;
        }

        self.collect_unsorted(&modules)?;
        self.check_supplements();
        self.modules = modules;
        Ok(())
    }
}

fn load_unneeded(input_dir: &Path) -> Result<Vec<Regex>> {
    let path = input_dir.join("unneeded.yml");
    if !path.is_file() {
        return Ok(Vec::new());
    }
    debug!("reading {}", path.display());
    let document: BTreeMap<String, Vec<String>> =
        serde_yaml::from_str(&std::fs::read_to_string(&path)?)?;
    let mut patterns = Vec::new();
    for pattern in document.into_values().flatten() {
        // patterns match from the start of the name
        patterns.push(Regex::new(&format!("^(?:{pattern})"))?);
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ClosureResolver;
    use crate::universe::Solvable;

    fn config(architectures: &[&str]) -> CompositionConfig {
        CompositionConfig {
            architectures: architectures.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    fn plain_entry(name: &str) -> PlanEntry {
        PlanEntry {
            name: name.to_string(),
            settings: ModuleSettings::default(),
        }
    }

    #[test]
    fn compose_without_plan_is_fatal() {
        let universe = Universe::new();
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&[]), &universe, &resolver);
        assert!(matches!(composer.compose(), Err(Error::OutputSpecMissing)));
    }

    #[test]
    fn duplicate_plan_is_rejected() {
        let universe = Universe::new();
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&[]), &universe, &resolver);
        composer.set_plan(OutputPlan::default()).unwrap();
        assert!(matches!(
            composer.set_plan(OutputPlan::default()),
            Err(Error::DuplicateOutputSpec)
        ));
    }

    #[test]
    fn include_packages_attributed_to_base_only() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("pkgX"));
        universe.insert("x86_64", Solvable::new("pkgY"));
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&["x86_64"]), &universe, &resolver);

        let mut g1 = Group::new("g1");
        g1.add_package("pkgX", None);
        composer.add_group(g1);
        let mut g2 = Group::new("g2");
        g2.add_package("pkgX", None);
        g2.add_package("pkgY", None);
        composer.add_group(g2);

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("g1"));
        plan.entries.push(PlanEntry {
            name: "g2".to_string(),
            settings: ModuleSettings {
                includes: vec!["g1".to_string()],
                ..Default::default()
            },
        });
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        assert!(composer.group("g1").unwrap().full_package_set().contains("pkgX"));
        let g2 = composer.group("g2").unwrap();
        assert!(!g2.full_package_set().contains("pkgX"));
        assert!(g2.full_package_set().contains("pkgY"));
    }

    #[test]
    fn include_chains_keep_single_attribution() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("glibc"));
        universe.insert("x86_64", Solvable::new("bash").requires(&["glibc"]));
        universe.insert("x86_64", Solvable::new("vim").requires(&["glibc"]));
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&["x86_64"]), &universe, &resolver);

        let mut g1 = Group::new("g1");
        g1.add_package("glibc", None);
        composer.add_group(g1);
        let mut g2 = Group::new("g2");
        g2.add_package("bash", None);
        composer.add_group(g2);
        let mut g3 = Group::new("g3");
        g3.add_package("vim", None);
        composer.add_group(g3);

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("g1"));
        plan.entries.push(PlanEntry {
            name: "g2".to_string(),
            settings: ModuleSettings {
                includes: vec!["g1".to_string()],
                ..Default::default()
            },
        });
        plan.entries.push(PlanEntry {
            name: "g3".to_string(),
            settings: ModuleSettings {
                includes: vec!["g2".to_string()],
                ..Default::default()
            },
        });
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        // glibc stays attributed to g1 even though g3 only includes g2
        assert!(composer.group("g1").unwrap().full_package_set().contains("glibc"));
        assert!(!composer.group("g2").unwrap().full_package_set().contains("glibc"));
        let g3 = composer.group("g3").unwrap().full_package_set();
        assert!(!g3.contains("glibc"));
        assert!(!g3.contains("bash"));
        assert!(g3.contains("vim"));
    }

    #[test]
    fn overlap_is_folded_into_overlap_group() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("shared"));
        universe.insert("x86_64", Solvable::new("a-only"));
        universe.insert("x86_64", Solvable::new("b-only"));
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&["x86_64"]), &universe, &resolver);

        let mut a = Group::new("alpha");
        a.add_package("shared", None);
        a.add_package("a-only", None);
        composer.add_group(a);
        let mut b = Group::new("beta");
        b.add_package("shared", None);
        b.add_package("b-only", None);
        composer.add_group(b);
        composer.add_group(Group::new(OVERLAP_GROUP));

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("alpha"));
        plan.entries.push(plain_entry("beta"));
        plan.entries.push(plain_entry(OVERLAP_GROUP));
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        let overlap = composer.group(OVERLAP_GROUP).unwrap();
        assert!(overlap.full_package_set().contains("shared"));
        assert!(overlap.comment.contains("alpha"));
        assert!(overlap.comment.contains("beta"));
        // withdrawn from both siblings
        assert!(!composer.group("alpha").unwrap().full_package_set().contains("shared"));
        assert!(!composer.group("beta").unwrap().full_package_set().contains("shared"));
        assert!(
            composer
                .diagnostics
                .iter()
                .any(|d| matches!(d, Diagnostic::Overlap { .. }))
        );
    }

    #[test]
    fn conflicts_suppress_overlap_detection() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("shared"));
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&["x86_64"]), &universe, &resolver);

        let mut a = Group::new("alpha");
        a.add_package("shared", None);
        composer.add_group(a);
        let mut b = Group::new("beta");
        b.add_package("shared", None);
        composer.add_group(b);
        composer.add_group(Group::new(OVERLAP_GROUP));

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("alpha"));
        plan.entries.push(PlanEntry {
            name: "beta".to_string(),
            settings: ModuleSettings {
                conflicts: vec!["alpha".to_string()],
                ..Default::default()
            },
        });
        plan.entries.push(plain_entry(OVERLAP_GROUP));
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        assert!(composer.group(OVERLAP_GROUP).unwrap().full_package_set().is_empty());
        assert!(
            !composer
                .diagnostics
                .iter()
                .any(|d| matches!(d, Diagnostic::Overlap { .. }))
        );
    }

    #[test]
    fn leftover_accounting_is_complete() {
        let mut universe = Universe::new();
        for name in ["claimed", "everywhere-left", "x86-left"] {
            universe.insert("x86_64", Solvable::new(name));
        }
        universe.insert("aarch64", Solvable::new("claimed"));
        universe.insert("aarch64", Solvable::new("everywhere-left"));
        let resolver = ClosureResolver::new(&universe);
        let mut composer =
            Composer::new(config(&["x86_64", "aarch64"]), &universe, &resolver);

        let mut g = Group::new("base");
        g.add_package("claimed", None);
        composer.add_group(g);

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("base"));
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        let unsorted = composer.unsorted();
        assert_eq!(unsorted.packages.len(), 2);
        assert_eq!(
            unsorted.packages["everywhere-left"].architectures.len(),
            2
        );
        let x86_left = &unsorted.packages["x86-left"].architectures;
        assert_eq!(x86_left.iter().collect::<Vec<_>>(), ["x86_64"]);

        // union of claimed and leftover equals the universe per arch
        let claimed = composer.group("base").unwrap().full_package_set();
        let mut total: BTreeSet<String> = claimed;
        for (name, entry) in &unsorted.packages {
            if entry.architectures.contains("x86_64") {
                total.insert(name.clone());
            }
        }
        let all_x86: BTreeSet<String> =
            universe.packages("x86_64").map(|s| s.name.clone()).collect();
        assert_eq!(total, all_x86);
    }

    #[test]
    fn unneeded_and_unwanted_are_excluded_from_unsorted() {
        let mut universe = Universe::new();
        for name in ["keepme", "texlive-foo", "badpkg"] {
            universe.insert("x86_64", Solvable::new(name));
        }
        let resolver = ClosureResolver::new(&universe);
        let mut config = config(&["x86_64"]);
        config.unwanted.insert("badpkg".to_string());
        let mut composer = Composer::new(config, &universe, &resolver);
        composer.unneeded = vec![Regex::new("^(?:texlive-.*)").unwrap()];

        composer.add_group(Group::new("base"));
        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("base"));
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        let names: Vec<_> = composer.unsorted().packages.keys().collect();
        assert_eq!(names, ["keepme"]);
    }

    #[test]
    fn require_all_is_satisfied_by_the_include_floor() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("pkgX"));
        universe.insert("x86_64", Solvable::new("pkgY"));
        universe.insert("aarch64", Solvable::new("pkgX"));
        universe.insert("aarch64", Solvable::new("pkgY"));
        // pkgZ only exists on x86_64, so the base group records it there
        universe.insert("x86_64", Solvable::new("pkgZ"));
        let resolver = ClosureResolver::new(&universe);
        let mut composer =
            Composer::new(config(&["x86_64", "aarch64"]), &universe, &resolver);

        let mut g1 = Group::new("g1");
        g1.add_package("pkgX", None);
        g1.add_package("pkgZ", Some("x86_64"));
        composer.add_group(g1);
        let mut g2 = Group::new("g2");
        g2.add_package("pkgY", None);
        composer.add_group(g2);

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("g1"));
        plan.entries.push(PlanEntry {
            name: "g2".to_string(),
            settings: ModuleSettings {
                includes: vec!["g1".to_string()],
                require_all: true,
                ..Default::default()
            },
        });
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        // the floor install covers g1's packages, so nothing is missing
        assert!(!composer.has_errors());
    }

    #[test]
    fn require_all_reports_missing_include_package() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("pkgX"));
        universe.insert("x86_64", Solvable::new("pkgY"));
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&["x86_64"]), &universe, &resolver);

        let mut g1 = Group::new("g1");
        g1.add_package("pkgX", None);
        composer.add_group(g1);
        // g2 locks a package its floor needs, so the floor cannot install
        let mut g2 = Group::new("g2");
        g2.add_package("pkgY", None);
        g2.locked.insert("pkgX".to_string());
        composer.add_group(g2);

        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("g1"));
        plan.entries.push(PlanEntry {
            name: "g2".to_string(),
            settings: ModuleSettings {
                includes: vec!["g1".to_string()],
                require_all: true,
                ..Default::default()
            },
        });
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        assert!(composer.has_errors());
        assert!(composer.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::MissingImportantPackage { package, .. } if package == "pkgX"
        )));
    }

    #[test]
    fn supplement_check_flags_unclaimed_hardware_packages() {
        let mut universe = Universe::new();
        universe.insert("x86_64", Solvable::new("claimed"));
        universe.insert(
            "x86_64",
            Solvable::new("kernel-firmware-foo").supplements(&["namespace:modalias(pci:1234)"]),
        );
        let resolver = ClosureResolver::new(&universe);
        let mut composer = Composer::new(config(&["x86_64"]), &universe, &resolver);

        let mut g = Group::new("base");
        g.add_package("claimed", None);
        composer.add_group(g);
        let mut plan = OutputPlan::default();
        plan.entries.push(plain_entry("base"));
        composer.set_plan(plan).unwrap();
        composer.compose().unwrap();

        assert!(composer.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UnclaimedSupplement { package } if package == "kernel-firmware-foo"
        )));
    }
}
